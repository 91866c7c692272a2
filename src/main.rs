fn main() {
    if let Err(err) = feature_fields::run() {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}
