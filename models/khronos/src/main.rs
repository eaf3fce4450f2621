use clap::Parser;

use std::{
	fs::File,
	io::{
		BufReader,
		Write,
		self
	},
	path::PathBuf,
	process
};

use glbkit_models_khronos::{
	glb::{
		import::GlbImportError,
		ReadCfg
	},
	parse_with,
	report::{
		ReportCfg,
		write_error,
		write_report
	}
};

/// Lists the meshes and accessors stored in a binary glTF (.glb) file
#[derive(Debug, Parser)]
#[command(name = "glb-inspect", version, about)]
struct Args {
	/// Binary glTF file to inspect
	file: PathBuf,
	/// Print the container header and chunk table
	#[arg(long)]
	chunks: bool,
	/// Reject chunk lengths that are not padded to 4 bytes
	#[arg(long)]
	strict: bool,
	/// Log every chunk scanned
	#[arg(short, long)]
	verbose: bool,
}

fn run(args: &Args) -> Result<Vec<u8>, GlbImportError> {
	let mut data = BufReader::new(File::open(&args.file)?);
	let cfg = ReadCfg {
		strict_padding: args.strict,
		..ReadCfg::default()
	};
	let glb = parse_with(&mut data, &cfg)?;

	// rendered up front so a failure never leaves a partial report on stdout
	let mut report = vec![];
	write_report(&glb, &ReportCfg { chunks: args.chunks }, &mut report)?;

	Ok(report)
}

/// Sends the report to `out`, or the diagnostic to `err`, and returns the process exit code
fn finish<O, E>(result: Result<Vec<u8>, GlbImportError>, out: &mut O, err: &mut E) -> i32
where
	O: Write,
	E: Write,
{
	let written = match result {
		Ok(report) => match out.write_all(&report).and_then(|_| out.flush()) {
			Ok(()) => return 0,
			Err(e) => writeln!(err, "error[io]: {}", e),
		},
		Err(e) => write_error(&e, err),
	};

	if let Err(e) = written {
		log::error!("could not write diagnostic: {}", e);
	}
	1
}

fn main() {
	let args = Args::parse();

	let filter = if args.verbose { "debug" } else { "warn" };
	env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(filter)).init();

	let code = finish(run(&args), &mut io::stdout().lock(), &mut io::stderr().lock());
	process::exit(code);
}
