use std::io;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("failed to write output: {0}")]
    Output(#[source] io::Error),
    #[error("failed to read input: {0}")]
    Input(#[source] io::Error),
}
