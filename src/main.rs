use clap::Parser;
use csv_insight::domain::ports::{Assistant, Storage};
use csv_insight::utils::logger::{self, LogFormat};
use csv_insight::utils::{error::ErrorSeverity, validation::Validate};
use csv_insight::{AnalyzerError, AppConfig, CliConfig, GroqAssistant, LocalStorage, Reply, Session};
use std::io::{BufRead, Write};
use std::sync::Arc;

fn exit_with(e: &AnalyzerError) -> ! {
    tracing::error!(
        "❌ {} (Category: {:?}, Severity: {:?})",
        e,
        e.category(),
        e.severity()
    );
    tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());
    eprintln!("❌ {}", e.user_friendly_message());
    eprintln!("💡 {}", e.recovery_suggestion());

    // 根據錯誤嚴重程度決定退出碼
    let exit_code = match e.severity() {
        ErrorSeverity::Low => 0,
        ErrorSeverity::Medium => 2,
        ErrorSeverity::High => 1,
        ErrorSeverity::Critical => 3,
    };
    std::process::exit(exit_code);
}

fn print_reply(reply: &Reply, html: bool) {
    match reply {
        Reply::Answer(answer) if html => println!("{}", answer.to_html()),
        other => println!("{}", other),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = CliConfig::parse();

    // 初始化日誌
    let format = if cli.log_json {
        LogFormat::Json
    } else {
        LogFormat::Compact
    };
    logger::init_logger(format, cli.verbose);

    tracing::info!("Starting csv-insight");
    tracing::debug!("CLI config: {:?}", cli);

    // 驗證配置
    let config = match &cli.config {
        Some(path) => AppConfig::from_file(path),
        None => Ok(AppConfig::default()),
    }
    .and_then(|config| {
        cli.validate()?;
        config.validate()?;
        Ok(config)
    })
    .unwrap_or_else(|e| exit_with(&e));

    // 建立一次，之後注入 session
    let assistant: Option<Arc<dyn Assistant>> =
        match GroqAssistant::from_config(&config.assistant, cli.api_key.as_deref()) {
            Ok(assistant) => assistant.map(|a| Arc::new(a) as Arc<dyn Assistant>),
            Err(e) => {
                tracing::warn!("⚠️ AI fallback unavailable: {}", e);
                None
            }
        };

    let storage = LocalStorage::new(".".to_string());
    let raw = storage
        .read_file(&cli.file)
        .await
        .unwrap_or_else(|e| exit_with(&e));

    let session = Session::from_upload(
        &raw,
        &config.ingest,
        assistant,
        config.assistant.sample_rows,
    )
    .unwrap_or_else(|e| exit_with(&e));

    println!("{}", session.summary());
    println!();

    if !cli.questions.is_empty() {
        for question in &cli.questions {
            println!("> {}", question);
            print_reply(&session.ask(question).await, cli.html);
            println!();
        }
        return Ok(());
    }

    // 互動模式：逐行讀取問題
    let stdin = std::io::stdin();
    loop {
        print!("? ");
        std::io::stdout().flush()?;

        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            break;
        }
        let question = line.trim();
        if question.is_empty() {
            continue;
        }
        print_reply(&session.ask(question).await, cli.html);
        println!();
    }

    Ok(())
}
