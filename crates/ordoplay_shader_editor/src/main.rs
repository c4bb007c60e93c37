// SPDX-License-Identifier: MIT OR Apache-2.0
//! `OrdoPlay` Shader Editor - headless front-end
//!
//! Creates, inspects and compiles shader graph sessions without the
//! editor UI:
//! - `new <session>` writes the default graph
//! - `info <session>` logs what a session contains
//! - `generate <session>` writes `_vs.sc`, `_fs.sc` and `.shd` next to it

mod cli;

use cli::Cli;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

fn main() {
    let env_filter = tracing_subscriber::EnvFilter::from_default_env()
        .add_directive("ordoplay_shader_editor=info".parse().unwrap())
        .add_directive("shader_editor=info".parse().unwrap());

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = match Cli::parse(std::env::args().skip(1)) {
        Ok(cli) => cli,
        Err(e) => {
            tracing::error!("{e}");
            eprintln!("{}", cli::USAGE);
            std::process::exit(1);
        }
    };

    if let Err(e) = cli.run() {
        tracing::error!("Shader editor failed: {e}");
        std::process::exit(1);
    }
}
