// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! `warden`: runs the stability layer on the headless pipeline and reads
//! control commands from standard input.

use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context as _;
use clap::{Parser, Subcommand};
use warden_control::DrawCall;
use warden_core::renderer::GraphicsDevice;
use warden_infra::HeadlessConfig;
use warden_lanes::{ProbeVertex, PROBE_TRIANGLE};
use warden_runtime::{
    assemble_headless, ControlCommand, ControlSurface, Orchestrator, WardenConfig,
};

#[derive(Parser, Debug)]
#[command(name = "warden", version)]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the orchestrator and the interactive control loop.
    Run(RunArgs),
    /// Parse and validate a configuration file, then print it resolved.
    CheckConfig(CheckArgs),
}

#[derive(Parser, Debug)]
struct RunArgs {
    /// JSON configuration file. Defaults apply when omitted.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Stop after this many frames.
    #[arg(long)]
    frames: Option<u64>,

    /// Do not read control commands from standard input.
    #[arg(long, default_value_t = false)]
    no_console: bool,
}

#[derive(Parser, Debug)]
struct CheckArgs {
    /// JSON configuration file.
    path: PathBuf,
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    match cli.cmd {
        Command::Run(args) => cmd_run(args),
        Command::CheckConfig(args) => cmd_check_config(args),
    }
}

fn cmd_check_config(args: CheckArgs) -> anyhow::Result<()> {
    let config = WardenConfig::load(&args.path)?.apply_env_override();
    let json = serde_json::to_string_pretty(&config).context("Failed to serialize config")?;
    println!("{json}");
    Ok(())
}

fn cmd_run(args: RunArgs) -> anyhow::Result<()> {
    let config = WardenConfig::load_or_default(args.config.as_deref())?.apply_env_override();
    let warden = assemble_headless(config, HeadlessConfig::default())?;
    let context = Arc::clone(&warden.context);

    let stride = std::mem::size_of::<ProbeVertex>() as u32;
    let scene_buffer = warden
        .device
        .create_vertex_buffer(bytemuck::cast_slice(&PROBE_TRIANGLE), stride)
        .context("Failed to create the scene vertex buffer")?;
    let call = DrawCall {
        vertex_count: PROBE_TRIANGLE.len() as u32,
        ..DrawCall::bind(scene_buffer, stride, 0)
    };

    let mut orchestrator = Orchestrator::new(Arc::clone(&context))
        .with_scene(warden.graphics.clone(), call);
    orchestrator.start(args.frames);

    if args.no_console {
        if args.frames.is_some() {
            orchestrator.wait();
        } else {
            log::warn!("Warden: No frame limit and no console; stopping immediately.");
            orchestrator.stop();
        }
    } else {
        control_loop(&ControlSurface::new(Arc::clone(&context)))?;
        if args.frames.is_some() && orchestrator.is_running() {
            orchestrator.wait();
        } else {
            orchestrator.stop();
        }
    }

    log::info!("Warden: {} frames run.", orchestrator.frames());
    warden.device.release_buffer(scene_buffer);
    context.registry.clear();
    Ok(())
}

/// Reads commands until `exit` or end of input.
fn control_loop(surface: &ControlSurface) -> anyhow::Result<()> {
    println!("Warden control surface. Type 'help' for commands.");
    let stdin = io::stdin();
    let mut stdout = io::stdout();
    loop {
        print!("warden> ");
        stdout.flush().context("Failed to flush stdout")?;

        let mut line = String::new();
        if stdin.lock().read_line(&mut line).context("Failed to read stdin")? == 0 {
            return Ok(());
        }
        if line.trim().is_empty() {
            continue;
        }
        let exit = matches!(ControlCommand::parse(&line), Ok(ControlCommand::Exit));
        println!("{}", surface.execute_line(&line));
        if exit {
            return Ok(());
        }
    }
}
