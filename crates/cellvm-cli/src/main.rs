//! CellVM - CLI
//!
//! Command-line interface to run CellVM program images on the console.

use std::fs;
use std::path::{Path, PathBuf};
use std::process;
use std::sync::atomic::Ordering;

use clap::{Args, Parser, Subcommand};
use eyre::{eyre, WrapErr};

use cellvm_core::loader::{sample_image, ImageLoader, ProgramImage};
use cellvm_core::{VirtualMachine, VmConfig};
use cellvm_host::log::{self, Level};
use cellvm_host::{error, info, run_and_report, ConsolePorts, LoggingPorts};

#[derive(Parser, Debug)]
#[command(name = "cellvm", author, version, about, long_about = None)]
struct Cli {
    /// Only log warnings and errors
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Omit timestamps from log lines
    #[arg(long, global = true)]
    no_timestamp: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run a program image
    Run {
        /// Image file (binary unless --text)
        path: PathBuf,

        /// Parse the image as a text listing
        #[arg(long)]
        text: bool,

        #[command(flatten)]
        machine: MachineArgs,
    },
    /// Run the built-in sample program
    Demo {
        #[command(flatten)]
        machine: MachineArgs,
    },
    /// Convert a text listing into a binary image
    Pack {
        source: PathBuf,
        output: PathBuf,
    },
}

#[derive(Args, Debug)]
struct MachineArgs {
    /// Memory size in cells
    #[arg(long, default_value_t = cellvm_core::config::DEFAULT_MEMORY_SIZE)]
    memory_size: usize,

    /// Stop after this many instructions
    #[arg(long)]
    step_limit: Option<u64>,

    /// Maximum stack depth
    #[arg(long)]
    max_stack: Option<usize>,

    /// Treat unknown opcodes as NOP
    #[arg(long)]
    permissive: bool,

    /// Log every port request and event
    #[arg(short, long)]
    verbose: bool,

    /// Print registers, stack and ip after the run
    #[arg(long)]
    dump: bool,
}

impl MachineArgs {
    fn config(&self) -> VmConfig {
        VmConfig {
            memory_size: self.memory_size,
            step_limit: self.step_limit,
            max_stack_depth: self.max_stack,
            permissive_opcodes: self.permissive,
        }
    }
}

fn main() -> eyre::Result<()> {
    let cli = Cli::parse();

    if cli.quiet {
        log::set_min_level(Level::Warn);
    }
    if cli.no_timestamp {
        log::SHOW_TIMESTAMP.store(false, Ordering::Relaxed);
    }

    match cli.command {
        Command::Run {
            path,
            text,
            machine,
        } => {
            let image = read_image(&path, text)?;
            info!(
                "loaded {} ({} cells in {} segments, entry {})",
                path.display(),
                image.cell_count(),
                image.segments.len(),
                image.entry_point
            );
            execute(&image, &machine)
        }
        Command::Demo { machine } => execute(&sample_image(), &machine),
        Command::Pack { source, output } => {
            let image = read_image(&source, true)?;
            let bytes = image.encode().wrap_err("image cannot be packed")?;
            fs::write(&output, bytes)
                .wrap_err_with(|| format!("failed to write {}", output.display()))?;
            info!("wrote {} cells to {}", image.cell_count(), output.display());
            Ok(())
        }
    }
}

fn read_image(path: &Path, text: bool) -> eyre::Result<ProgramImage> {
    if text {
        let source = fs::read_to_string(path)
            .wrap_err_with(|| format!("failed to read {}", path.display()))?;
        ImageLoader::parse_text(&source).wrap_err("invalid text image")
    } else {
        let bytes = fs::read(path).wrap_err_with(|| format!("failed to read {}", path.display()))?;
        ImageLoader::load(&bytes).wrap_err("invalid image")
    }
}

fn execute(image: &ProgramImage, args: &MachineArgs) -> eyre::Result<()> {
    let mut vm = VirtualMachine::new(args.config()).wrap_err("invalid machine configuration")?;
    image
        .install(&mut vm)
        .map_err(|kind| eyre!("image does not fit in memory: {}", kind))?;

    let mut console = ConsolePorts::stdio();
    let result = if args.verbose {
        run_and_report(&mut vm, &mut LoggingPorts::new(console))
    } else {
        run_and_report(&mut vm, &mut console)
    };

    if args.dump {
        dump(&vm);
    }

    if result.is_err() {
        error!("execution aborted");
        process::exit(1);
    }
    Ok(())
}

fn dump(vm: &VirtualMachine) {
    println!("ip:        {}", vm.ip());
    println!("running:   {}", vm.is_running());
    println!("steps:     {}", vm.steps());
    for (i, value) in vm.registers().as_slice().iter().enumerate() {
        println!("r{}:        {}", i, value);
    }
    println!("stack:     {:?}", vm.stack().as_slice());
    if let Some(fault) = vm.last_fault() {
        println!("fault:     {}", fault);
    }
}
