fn main() {
    sirocco::uci::run_uci_loop();
}
