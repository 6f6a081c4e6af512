fn main() {
    labtrend_lib::run()
}
