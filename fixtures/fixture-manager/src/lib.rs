// Copyright (c) The esop-min Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use clap::Parser;
use color_eyre::Result;
use fixture_details::AllFixtures;
use log::LevelFilter;
use simplelog::{ColorChoice, ConfigBuilder, TermLogger, TerminalMode};

#[derive(Debug, Parser)]
pub struct FixtureManagerApp {
    /// Log level for the terminal logger
    #[clap(long, global = true, default_value = "info")]
    log_level: LevelFilter,

    #[clap(subcommand)]
    command: FixtureManagerCommand,
}

#[derive(Debug, Parser)]
pub enum FixtureManagerCommand {
    /// Minimize random 8-input, 4-output covers and check each result.
    Minimize {
        /// Number of covers to generate
        #[clap(long, short, default_value_t = 64)]
        count: usize,

        /// Extra non-improving rounds tolerated per cover
        #[clap(long, short, default_value_t = 0)]
        quality: u32,
    },
}

impl FixtureManagerApp {
    pub fn exec(self) -> Result<()> {
        let config = ConfigBuilder::new().set_time_level(LevelFilter::Off).build();
        TermLogger::init(
            self.log_level,
            config,
            TerminalMode::Stderr,
            ColorChoice::Auto,
        )?;
        self.command.exec()
    }
}

impl FixtureManagerCommand {
    pub fn exec(self) -> Result<()> {
        match self {
            Self::Minimize { count, quality } => {
                let totals = AllFixtures::minimize_8_4(count, quality)?;
                println!("{}", totals);
                Ok(())
            }
        }
    }
}
