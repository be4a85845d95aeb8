use std::io::{self, BufRead, Write};

use anyhow::{Context, Result};

use lexis_lib::words::algorithm::format_interval;
use lexis_lib::words::Session;

use crate::app::App;
use crate::render::terminal::{paint, Color};

enum Answer {
    Known,
    Unknown,
    Quit,
}

fn prompt(input: &mut impl BufRead, message: &str) -> Result<Option<String>> {
    print!("{}", message);
    io::stdout().flush()?;
    let mut line = String::new();
    if input.read_line(&mut line)? == 0 {
        return Ok(None);
    }
    Ok(Some(line.trim().to_lowercase()))
}

fn ask(input: &mut impl BufRead) -> Result<Answer> {
    loop {
        let Some(reply) = prompt(input, "Did you know it? [y/n/q] ")? else {
            return Ok(Answer::Quit);
        };
        match reply.as_str() {
            "y" | "yes" => return Ok(Answer::Known),
            "n" | "no" => return Ok(Answer::Unknown),
            "q" | "quit" => return Ok(Answer::Quit),
            _ => println!("Please answer y, n or q."),
        }
    }
}

pub fn run(app: &App, limit: Option<usize>, use_color: bool) -> Result<()> {
    let scheduler = app.lexis.scheduler();
    let mut session = match limit {
        Some(limit) => Session::with_limit(scheduler, limit),
        None => Session::start(scheduler),
    }
    .context("Failed to start session")?;

    if session.is_complete() {
        println!("Nothing to review right now.");
        return Ok(());
    }

    let total = session.remaining();
    let stdin = io::stdin();
    let mut input = stdin.lock();

    while let Some(word) = session.current_word().cloned() {
        let position = total - session.remaining() + 1;
        println!();
        println!(
            "[{}/{}] {}",
            position,
            total,
            paint(&word.term, Color::BOLD, use_color)
        );

        if prompt(&mut input, "Press Enter to reveal... ")?.is_none() {
            break;
        }
        println!("  {}", paint(&word.translation, Color::CYAN, use_color));
        if !word.example.is_empty() {
            println!("  {}", paint(&word.example, Color::DIM, use_color));
        }

        let known = match ask(&mut input)? {
            Answer::Known => true,
            Answer::Unknown => false,
            Answer::Quit => break,
        };

        let Some(result) = session.mark_word(known).context("Failed to record review")? else {
            break;
        };
        let next = format_interval(result.word_result.days_until_review);
        if known {
            println!("{} next review in {}", paint("Correct,", Color::GREEN, use_color), next);
        } else {
            println!("{} next review in {}", paint("Missed,", Color::RED, use_color), next);
        }
    }

    let stats = session.stats();
    println!();
    println!(
        "Reviewed {} words: {} correct, {} missed ({}% accuracy)",
        stats.reviewed,
        stats.correct,
        stats.incorrect,
        stats.accuracy()
    );
    if !session.is_complete() {
        println!("{} words left for later.", session.remaining());
    }
    Ok(())
}
