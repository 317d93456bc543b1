fn main() {
    if let Err(err) = vertex_labeler::run() {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}
