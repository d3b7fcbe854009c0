fn main() {
    wm_sync::cli::main();
}
