mod alphabet;
mod cli;
mod config;
mod digits;
mod features;
mod geometry;
mod ipc;
mod landmarks;
mod logging;
mod orientation;
mod pose;
mod sequence;
mod service;
mod session;
mod smoothing;

fn main() -> anyhow::Result<()> {
    logging::init();
    cli::run()
}
