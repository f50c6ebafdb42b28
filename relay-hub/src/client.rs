use anyhow::{Context, Result};
use tokio::{
    io::{self, AsyncBufReadExt, AsyncWriteExt, BufReader},
    net::{
        TcpStream,
        tcp::{OwnedReadHalf, OwnedWriteHalf},
    },
    select,
};
use tracing::{info, warn};

use crate::{cli::ClientArgs, codec};

/// Sends one command and prints every line the hub sends back.
///
/// Keeps listening after the first reply so relayed messages show up, until
/// the hub closes the connection or Ctrl-C is pressed.
pub async fn run(args: ClientArgs) -> Result<()> {
    let (mut reader, mut writer) = establish_connection(&args).await?;

    let request = codec::encode_request(&args.cmd.to_uppercase(), &args.message, &args.to);
    codec::write_text(&mut writer, &request)
        .await
        .context("failed to send command to hub")?;
    info!("sent {} to the hub", args.cmd.to_uppercase());

    let mut line = String::new();
    loop {
        line.clear();
        select! {
            bytes_read = reader.read_line(&mut line) => {
                if !handle_hub_output(bytes_read, &line).await? {
                    break;
                }
            }
            ctrl_c = tokio::signal::ctrl_c() => {
                if let Err(error) = ctrl_c {
                    warn!(?error, "ctrl-c handler failed");
                }
                break;
            }
        }
    }

    if let Err(error) = writer.shutdown().await {
        warn!(?error, "failed to shutdown client writer cleanly");
    }
    info!("client done");
    Ok(())
}

async fn establish_connection(
    args: &ClientArgs,
) -> Result<(BufReader<OwnedReadHalf>, OwnedWriteHalf)> {
    let stream = TcpStream::connect(args.server)
        .await
        .with_context(|| format!("failed to connect to hub {}", args.server))?;

    info!("connected to hub {}", args.server);

    let (reader, writer) = stream.into_split();
    Ok((BufReader::new(reader), writer))
}

/// Prints what was read. A final fragment without a newline is still shown.
async fn handle_hub_output(bytes_read: io::Result<usize>, line: &str) -> Result<bool> {
    if bytes_read? == 0 {
        return Ok(false);
    }

    let text = line.trim_end_matches(['\r', '\n']);
    write_stdout(text).await?;
    Ok(line.ends_with('\n'))
}

async fn write_stdout(line: &str) -> io::Result<()> {
    let mut stdout = tokio::io::stdout();
    stdout.write_all(line.as_bytes()).await?;
    stdout.write_all(b"\n").await?;
    stdout.flush().await
}
