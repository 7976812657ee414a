use clap::Parser;
use client::game::Session;
use client::input::{parse_command, Command, HELP};
use client::network::Connection;
use client::rendering::{OutputFormat, Renderer};
use log::info;
use tokio::io::{AsyncBufReadExt, BufReader};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Server address to connect to
    #[arg(short = 's', long, default_value = "127.0.0.1:4949")]
    server: String,

    /// Print responses as JSON
    #[arg(long)]
    json: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let args = Args::parse();

    info!("Connecting to: {}", args.server);
    let mut connection = Connection::connect(args.server.as_str()).await?;
    let renderer = Renderer::new(if args.json {
        OutputFormat::Json
    } else {
        OutputFormat::Text
    });
    let mut session = Session::new();

    println!("Connected to {}. Type `help` for commands.", args.server);
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    while let Some(line) = lines.next_line().await? {
        let command = match parse_command(&line) {
            Ok(Some(command)) => command,
            Ok(None) => continue,
            Err(e) => {
                println!("{e}");
                continue;
            }
        };

        match command {
            Command::Quit => break,
            Command::Help => {
                println!("{HELP}");
                continue;
            }
            _ => {}
        }

        let mut next = match command.to_request(&session) {
            Ok(request) => request,
            Err(e) => {
                println!("{e}");
                continue;
            }
        };

        while let Some(request) = next.take() {
            let response = connection.request(&request).await?;
            session.apply(&request, &response);
            println!("{}", renderer.render(&response));
            next = session.follow_up(&response);
        }
    }

    if let Some(player) = session.player().cloned() {
        info!("Logging out {}", player);
        connection
            .request(&shared::Request::Exit { player })
            .await?;
    }

    Ok(())
}
