pub mod server;

/// Actions the CLI can resolve to.
#[derive(Debug)]
pub enum Action {
    Server(server::Args),
}
