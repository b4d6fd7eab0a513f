//! Reports which encoding strategies the local GPU actually supports
//!
//! Runs both capability probes against the default adapter and prints the
//! strategy pair that would be installed at load time.

use texelcode::backend::WgpuBackend;
use texelcode::{BackendProbe, CapabilityProbe, select_shader_coders};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let subscriber = tracing_subscriber::fmt().with_max_level(tracing::Level::DEBUG).finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let backend = WgpuBackend::request()?;
    let probe = BackendProbe::new(&backend);

    println!("float round-trip:         {}", if probe.float_round_trip_ok() { "ok" } else { "failed" });
    println!("float compute, byte read: {}", if probe.float_compute_byte_read_ok() { "ok" } else { "failed" });

    let (input, output) = select_shader_coders(&probe);
    println!("selected coders:          input={input:?} output={output:?}");

    Ok(())
}
