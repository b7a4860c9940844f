use std::path::PathBuf;

fn main() {
    let input = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("particles.toml"));
    if let Err(err) = particle_cluster::app::run(&input) {
        eprintln!("fatal: {err}");
        std::process::exit(1);
    }
}
