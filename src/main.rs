use auditrelay::app;

fn main() {
    app::startup::startup();
}
