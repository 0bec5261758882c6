fn main() {
    if let Err(err) = upload_stamp::run() {
        eprintln!("Error: {err}");
        std::process::exit(1);
    }
}
