use std::io::{self, Write};
use std::net::TcpStream;

use clap::Parser;
use serde::de::DeserializeOwned;
use serde::Serialize;

use shipyard::model::Ship;
use shipyard::parser::{self, Command};
use shipyard::protocol::*;
use shipyard::CompactionReport;

#[derive(Parser, Debug)]
#[clap(author, version, about = "Interactive client for the ship catalog", long_about = None)]
struct Args {
    #[clap(long, default_value = "127.0.0.1:9000")]
    host: String,
}

fn main() {
    let args = Args::parse();
    print_banner();

    match TcpStream::connect(&args.host) {
        Ok(_) => println!("[\u{2713}] Connected to Shipyard at {}!", args.host),
        Err(_) => {
            println!("[\u{2717}] Could not connect to server at {}.", args.host);
            println!("    Make sure to run 'cargo run --release --bin shipyard' in another terminal.");
            return;
        }
    }
    println!("Type 'HELP' for supported commands or 'EXIT' to quit.\n");

    let stdin = io::stdin();
    let mut buffer = String::new();

    loop {
        print!("shipyard> ");
        if io::stdout().flush().is_err() { break; }
        buffer.clear();

        match stdin.read_line(&mut buffer) {
            Ok(0) | Err(_) => break,
            Ok(_) => {}
        }
        if buffer.trim().is_empty() { continue; }

        match parser::parse_command(&buffer) {
            Ok(Command::Exit) => break,
            Ok(cmd) => {
                if let Err(e) = execute_command(&args.host, cmd) {
                    println!("[\u{26a0}\u{fe0f} Error] {}", e);
                }
            }
            Err(e) => {
                println!("[\u{2717} Syntax Error] {}", e);
                if buffer.to_uppercase().starts_with("LIST") {
                    println!("    \u{2139}\u{fe0f}  Hint: Try 'LIST WHERE speed >= 0.5 ORDER BY RATING PAGE 0 SIZE 5'");
                } else if buffer.to_uppercase().starts_with("CREATE") {
                    println!("    \u{2139}\u{fe0f}  Hint: Strings need double quotes: name=\"Falcon\"");
                }
            }
        }
    }
}

fn print_banner() {
    println!("\n==================================================");
    println!("   Shipyard CLI - Ship Catalog Client");
    println!("==================================================\n");
}

fn print_help() {
    println!("\n--- Available Commands ---");
    println!("1. LIST:    LIST [WHERE cond AND ...] [ORDER BY ID|SPEED|DATE|RATING] [PAGE n] [SIZE n]");
    println!("            cond: name CONTAINS \"s\" | planet CONTAINS \"s\" | type = MILITARY");
    println!("                  date > ms | date < ms | used = true | speed|crew|rating >= x | <= x");
    println!("2. COUNT:   COUNT [WHERE ...]");
    println!("3. GET:     GET 12");
    println!("4. CREATE:  CREATE name=\"Falcon\" planet=\"Mars\" type=MERCHANT date=32503680000000 speed=0.5 crew=10 [used=true]");
    println!("5. UPDATE:  UPDATE 12 SET speed=0.7, used=false");
    println!("6. DELETE:  DELETE 12");
    println!("7. COMPACT: Rewrite the server's log");
    println!("8. EXIT:    Quit\n");
}

fn execute_command(host: &str, cmd: Command) -> Result<(), String> {
    match cmd {
        Command::Help => { print_help(); Ok(()) },
        Command::List { criteria, order, page_number, page_size } => {
            let req = ListRequest { criteria, order, page_number, page_size };
            let ships: Vec<Ship> = call(host, OP_LIST, &req)?;
            print_ships(&ships);
            Ok(())
        },
        Command::Count { criteria } => {
            let req = ListRequest { criteria, ..Default::default() };
            let body: CountBody = call(host, OP_COUNT, &req)?;
            println!("{} ship(s) match.", body.count);
            Ok(())
        },
        Command::Get { id } => {
            let ship: Ship = call(host, OP_GET, &IdRequest { id: Some(id) })?;
            print_ships(std::slice::from_ref(&ship));
            Ok(())
        },
        Command::Create { draft } => {
            let ship: Ship = call(host, OP_CREATE, &draft)?;
            println!("[\u{2713} OK] Created ship {} (rating {:.2})", ship.id, ship.rating);
            Ok(())
        },
        Command::Update { id, patch } => {
            let ship: Ship = call(host, OP_UPDATE, &UpdateRequest { id: Some(id), patch })?;
            println!("[\u{2713} OK] Updated ship {}", ship.id);
            print_ships(std::slice::from_ref(&ship));
            Ok(())
        },
        Command::Delete { id } => {
            let _: serde_json::Value = call(host, OP_DELETE, &IdRequest { id: Some(id.clone()) })?;
            println!("[\u{2713} OK] Deleted ship {}", id);
            Ok(())
        },
        Command::Compact => {
            let report: CompactionReport = call(host, OP_COMPACT, &serde_json::json!({}))?;
            println!(
                "[\u{2713} OK] Compacted: {} live ship(s), {} -> {} bytes",
                report.live, report.bytes_before, report.bytes_after
            );
            Ok(())
        },
        Command::Exit => Ok(()),
    }
}

// --- NETWORK ---

fn call<Req: Serialize, Resp: DeserializeOwned>(host: &str, op: u8, req: &Req) -> Result<Resp, String> {
    let body = serde_json::to_vec(req).map_err(|e| e.to_string())?;

    let mut stream = TcpStream::connect(host).map_err(|e| e.to_string())?;
    write_frame(&mut stream, op, &body).map_err(|e| e.to_string())?;
    let (status, reply) = read_frame(&mut stream).map_err(|e| e.to_string())?;

    if status == STATUS_OK {
        return serde_json::from_slice(&reply).map_err(|e| format!("Bad response: {}", e));
    }

    let message = serde_json::from_slice::<ErrorBody>(&reply)
    .map(|b| b.error)
    .unwrap_or_else(|_| String::from_utf8_lossy(&reply).into_owned());
    let kind = match status {
        STATUS_BAD_REQUEST => "Bad Request",
        STATUS_NOT_FOUND => "Not Found",
        _ => "Server Error",
    };
    Err(format!("{}: {}", kind, message))
}

fn print_ships(ships: &[Ship]) {
    if ships.is_empty() {
        println!("(no ships)");
        return;
    }
    println!(
        "\n{:>5}  {:<24} {:<16} {:<10} {:>5} {:>5}  {:>5}  {:>5}  {:>7}",
        "ID", "NAME", "PLANET", "TYPE", "YEAR", "USED", "SPEED", "CREW", "RATING"
    );
    for s in ships {
        let year = s.production_year().map(|y| y.to_string()).unwrap_or_else(|| "?".into());
        println!(
            "{:>5}  {:<24} {:<16} {:<10} {:>5} {:>5}  {:>5.2}  {:>5}  {:>7.2}",
            s.id, s.name, s.planet, s.ship_type.as_str(), year, s.is_used, s.speed, s.crew_size, s.rating
        );
    }
    println!();
}
