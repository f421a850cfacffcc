fn main() {
    if let Err(e) = recipecast::cli::main() {
        eprintln!("❌ Error: {e}");
        std::process::exit(1);
    }
}
