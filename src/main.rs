fn main() {
    if let Err(err) = bizdata_analyzer::run() {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}
