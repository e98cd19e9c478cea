#[macro_use]
extern crate log;

use anyhow::{Context, Result};
use clap::Parser;

use raidline::bus::client::mock::MockBusClient;
use raidline::bus::opcode::{RequestFields, ResponseFields};
use raidline::{cli::Args, cli::Commands, BusClient, BusError, Driver, TcpBusClient};

/// Dispatches to whichever transport `--simulate` selected, so `main`
/// doesn't need to be generic over `Driver<B>` twice.
enum AnyBus {
    Tcp(TcpBusClient),
    Mock(MockBusClient),
}

impl BusClient for AnyBus {
    fn call(
        &mut self,
        fields: RequestFields,
        payload: Option<&[u8]>,
    ) -> std::result::Result<(ResponseFields, Option<Vec<u8>>), BusError> {
        match self {
            AnyBus::Tcp(bus) => bus.call(fields, payload),
            AnyBus::Mock(bus) => bus.call(fields, payload),
        }
    }
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();
    let config = args.config();

    let bus = if args.simulate {
        info!("running in simulate mode, no bus connection made");
        AnyBus::Mock(MockBusClient::new(
            config.disks,
            config.blocks_per_disk,
            config.block_size,
        ))
    } else {
        let addr = format!("{}:{}", args.host, args.port);
        info!("connecting to bus at {addr}");
        AnyBus::Tcp(
            TcpBusClient::connect(addr.as_str(), config.block_size)
                .with_context(|| format!("failed to connect to bus at {addr}"))?,
        )
    };

    let mut driver = Driver::init(bus, config, args.maxlines).context("driver init failed")?;

    match args.command {
        Commands::Write { tag, bnum, fill } => {
            let buf = vec![fill; config.block_size];
            driver
                .write(tag, bnum, 1, &buf)
                .context("write failed")?;
            info!("wrote tagline {tag} block {bnum}");
        }
        Commands::Read { tag, bnum } => {
            let mut buf = vec![0u8; config.block_size];
            driver
                .read(tag, bnum, 1, &mut buf)
                .context("read failed")?;
            println!("{}", buf.iter().map(|b| format!("{b:02x}")).collect::<String>());
        }
        Commands::Recover => {
            driver.disk_signal().context("recovery failed")?;
            info!("recovery pass complete");
        }
    }

    let stats = driver.close().context("close failed")?;
    info!(
        "final cache stats: {} gets, {:.1}% hit ratio",
        stats.gets,
        stats.hit_ratio() * 100.0
    );
    Ok(())
}
