//! # CLI - TernDB Interactive Shell
//!
//! A REPL-style command-line interface for the TernDB key-set store.
//! Reads commands from stdin, executes them against the engine, and prints
//! results to stdout. Designed for both interactive use and scripted
//! testing (pipe commands via stdin).
//!
//! ## Commands
//!
//! ```text
//! PUT key               Insert a key
//! DEL key               Tombstone a key
//! HAS key               Membership test (prints true/false)
//! MATCH pattern [seg]   Wildcard search; `*` matches any run of bytes.
//!                       With seg, print the seg-th separator-delimited
//!                       segment of each match instead of the full key
//! SWEEP pattern         Tombstone every key matching pattern
//! KEYS [DESC]           List all keys in order
//! SEP [byte]            Show or set the segment separator
//! STATE                 Print the balance estimate
//! STATS                 Print engine debug info
//! OPTIMIZE              Shuffle-rebuild the tree (rotates the journal)
//! CLEAR                 Empty the store and truncate the journal
//! DUMP                  Print the node arena listing
//! EXIT / QUIT           Shut down gracefully
//! ```
//!
//! ## Configuration
//!
//! All settings are controlled via environment variables:
//!
//! ```text
//! TERN_DB_PATH   Journal file path; ":memory:" for ephemeral (default: "tern.db")
//! TERN_SYNC      fsync every journal append (default: "true")
//! ```

use anyhow::Result;
use engine::Engine;
use std::io::{self, BufRead, Write};

/// Reads a configuration value from the environment, falling back to `default`.
fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn main() -> Result<()> {
    env_logger::init();

    let db_path = env_or("TERN_DB_PATH", "tern.db");
    let sync: bool = env_or("TERN_SYNC", "true").parse().unwrap_or(true);

    let mut engine = if db_path == ":memory:" {
        Engine::in_memory()
    } else {
        Engine::open(&db_path, sync)?
    };

    println!(
        "TernDB started (keys={}, nodes={}, path={}, sync={})",
        engine.key_count(),
        engine.node_count(),
        db_path,
        sync
    );
    println!("Commands: PUT key | DEL key | HAS key | MATCH pattern [seg] | SWEEP pattern");
    println!("          KEYS [DESC] | SEP [byte] | STATE | STATS | OPTIMIZE | CLEAR | DUMP | EXIT");
    print!("> ");
    io::stdout().flush().ok();

    let stdin = io::stdin();

    for line in stdin.lock().lines() {
        let line = line?;
        let mut parts = line.split_whitespace();
        if let Some(cmd) = parts.next() {
            match cmd.to_uppercase().as_str() {
                "PUT" => {
                    if let Some(k) = parts.next() {
                        match engine.put(k.as_bytes()) {
                            Ok(true) => println!("OK"),
                            Ok(false) => println!("(no change)"),
                            Err(e) => println!("ERR put failed: {}", e),
                        }
                    } else {
                        println!("ERR usage: PUT key");
                    }
                }
                "DEL" => {
                    if let Some(k) = parts.next() {
                        match engine.remove(k.as_bytes()) {
                            Ok(true) => println!("OK"),
                            Ok(false) => println!("(no change)"),
                            Err(e) => println!("ERR del failed: {}", e),
                        }
                    } else {
                        println!("ERR usage: DEL key");
                    }
                }
                "HAS" => {
                    if let Some(k) = parts.next() {
                        println!("{}", engine.contains(k.as_bytes()));
                    } else {
                        println!("ERR usage: HAS key");
                    }
                }
                "MATCH" => {
                    if let Some(pattern) = parts.next() {
                        let segment = parts.next().and_then(|s| s.parse::<usize>().ok());
                        let mut count = 0usize;
                        engine.search(pattern.as_bytes(), segment, |key| {
                            println!("{}", String::from_utf8_lossy(key));
                            count += 1;
                        });
                        println!("({} matches)", count);
                    } else {
                        println!("ERR usage: MATCH pattern [segment]");
                    }
                }
                "SWEEP" => {
                    if let Some(pattern) = parts.next() {
                        match engine.remove_matching(pattern.as_bytes()) {
                            Ok(n) => println!("({} removed)", n),
                            Err(e) => println!("ERR sweep failed: {}", e),
                        }
                    } else {
                        println!("ERR usage: SWEEP pattern");
                    }
                }
                "KEYS" => {
                    let descending = parts
                        .next()
                        .map(|p| p.eq_ignore_ascii_case("DESC"))
                        .unwrap_or(false);
                    let mut count = 0usize;
                    engine.keys(descending, |key| {
                        println!("{}", String::from_utf8_lossy(key));
                        count += 1;
                    });
                    println!("({} keys)", count);
                }
                "SEP" => match parts.next() {
                    Some(s) if s.len() == 1 => {
                        engine.set_separator(s.as_bytes()[0]);
                        println!("OK");
                    }
                    Some(_) => println!("ERR separator must be a single byte"),
                    None => println!("{}", engine.separator() as char),
                },
                "STATE" => {
                    println!("{:.4}", engine.state());
                }
                "STATS" => {
                    println!("{:?}", engine);
                }
                "OPTIMIZE" => match engine.optimize(&mut rand::thread_rng()) {
                    Ok(()) => println!("OK (balance {:.4})", engine.state()),
                    Err(e) => println!("ERR optimize failed: {}", e),
                },
                "CLEAR" => match engine.clear() {
                    Ok(()) => println!("OK"),
                    Err(e) => println!("ERR clear failed: {}", e),
                },
                "DUMP" => {
                    engine.dump(|l| println!("{}", l));
                }
                "EXIT" | "QUIT" => {
                    println!("bye");
                    break;
                }
                other => {
                    println!("ERR unknown command: {}", other);
                }
            }
        }
        print!("> ");
        io::stdout().flush().ok();
    }

    engine.close()?;
    Ok(())
}
