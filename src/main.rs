fn main() {
    if let Err(err) = hg_renderer::run() {
        eprintln!("Application error: {err}");
        std::process::exit(1);
    }
}
