fn main() {
    std::process::exit(nanoc_drv::main());
}
