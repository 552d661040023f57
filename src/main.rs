use std::path::PathBuf;

use structopt::StructOpt;

use irbridge_shared::SerialLink;

mod bridge;
mod bus;
mod device;
mod irsend;
mod listen;
mod vcdutils;

use crate::bus::StdoutSink;
use crate::device::{NullAcCodec, SerialTransceiver};

#[derive(Debug, StructOpt)]
#[structopt(name = "irbridge", about = "Infrared remote bus bridge")]
struct Opt {
    /// Serial device. Defaults to the first port found
    #[structopt(long = "device", parse(from_os_str))]
    serial: Option<PathBuf>,
    #[structopt(short, long)]
    debug: bool,
    #[structopt(subcommand)]
    cmd: CliCommand,
}

#[derive(StructOpt, Debug)]
enum CliCommand {
    /// Bridge bus messages on stdin/stdout to the transceiver
    Bridge,
    /// Report captured signals. Optionally dump them to a vcd file
    Listen {
        #[structopt(long, parse(from_os_str))]
        vcd: Option<PathBuf>,
    },
    /// Transmit a raw frame, e.g. "3 0041 0032 0F9C"
    SendRaw {
        message: String,
        /// Carrier frequency in kHz
        #[structopt(long, default_value = "38")]
        carrier: u8,
    },
    /// Transmit a structured AC command given as JSON
    SendAc { json: String },
    /// Query transceiver firmware info
    Info,
}

fn main() -> anyhow::Result<()> {
    let opt = Opt::from_args();

    let loglevel = if opt.debug {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    };

    env_logger::Builder::from_default_env()
        .filter_level(loglevel)
        .init();

    let path_serialport = if let Some(path) = opt.serial {
        path
    } else if let Ok(ports) = SerialLink::list_ports() {
        ports
            .first()
            .map(|port| PathBuf::from(&port.port_name))
            .unwrap_or_else(|| PathBuf::from("/dev/ttyACM0"))
    } else {
        PathBuf::from("/dev/ttyACM0")
    };

    let mut link = SerialLink::new();
    link.connect(&path_serialport)?;

    match opt.cmd {
        CliCommand::Bridge => {
            let mut bridge =
                bridge::Bridge::new(SerialTransceiver::new(link), NullAcCodec, StdoutSink);
            bus::run(&mut bridge)
        }
        CliCommand::Listen { vcd } => listen::command_listen(link, vcd),
        CliCommand::SendRaw { message, carrier } => irsend::send_raw(link, &message, carrier),
        CliCommand::SendAc { json } => irsend::send_ac(link, &json),
        CliCommand::Info => {
            let mut dev = SerialTransceiver::new(link);
            let info = dev.info()?;
            println!("version: {}", info.version);
            println!("samplerate: {} Hz", info.samplerate);
            Ok(())
        }
    }
}
