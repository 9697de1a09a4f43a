// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// JANDIVE CLI
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//
// CLI para execução do pipeline de pesquisa.
//
// Uso:
//   jandive-cli "Qual é a população do Brasil?"
//   jandive-cli --concise --max-iterations 2 "pergunta"
//   jandive-cli --offline "2 ** 10 / 4"
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

use std::io::Write;
use std::path::PathBuf;

use futures::StreamExt;
use jandive::prelude::*;
use tokio_util::sync::CancellationToken;

/// Tenta carregar o arquivo .env de múltiplos locais possíveis
fn load_dotenv() {
    let possible_paths = [
        PathBuf::from(".env"),
        PathBuf::from("../.env"),
        {
            let mut p = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
            p.push(".env");
            p
        },
    ];

    for path in &possible_paths {
        if path.exists() {
            match dotenvy::from_path(path) {
                Ok(_) => {
                    eprintln!(
                        "✓ Carregado .env de: {:?}",
                        path.canonicalize().unwrap_or(path.clone())
                    );
                    return;
                }
                Err(e) => {
                    eprintln!("⚠ Erro ao carregar {:?}: {}", path, e);
                }
            }
        }
    }
}

/// Opções da linha de comando
struct CliArgs {
    offline: bool,
    detail: DetailLevel,
    temperature: Option<f32>,
    max_iterations: Option<usize>,
    verbose: bool,
    query: String,
}

fn parse_args(args: &[String]) -> Result<CliArgs, String> {
    let mut cli = CliArgs {
        offline: false,
        detail: DetailLevel::Standard,
        temperature: None,
        max_iterations: None,
        verbose: false,
        query: String::new(),
    };
    let mut words = Vec::new();

    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            "--offline" => cli.offline = true,
            "--concise" => cli.detail = DetailLevel::Concise,
            "--detailed" => cli.detail = DetailLevel::Detailed,
            "--verbose" | "-v" => cli.verbose = true,
            "--detail" => {
                i += 1;
                let value = args.get(i).ok_or("--detail requer um valor")?;
                cli.detail = value.parse().unwrap_or_default();
            }
            "--temperature" => {
                i += 1;
                let value = args.get(i).ok_or("--temperature requer um valor")?;
                cli.temperature = Some(
                    value
                        .parse()
                        .map_err(|_| format!("Temperatura inválida: {}", value))?,
                );
            }
            "--max-iterations" => {
                i += 1;
                let value = args.get(i).ok_or("--max-iterations requer um valor")?;
                cli.max_iterations = Some(
                    value
                        .parse()
                        .map_err(|_| format!("Número de iterações inválido: {}", value))?,
                );
            }
            word => words.push(word.to_string()),
        }
        i += 1;
    }

    cli.query = words.join(" ").trim().to_string();
    Ok(cli)
}

fn print_usage(program: &str) {
    eprintln!("JanDive CLI v{}", jandive::VERSION);
    eprintln!();
    eprintln!("Uso: {} [opções] <pergunta>", program);
    eprintln!();
    eprintln!("Opções:");
    eprintln!("  --offline              Só calculadora, sem busca");
    eprintln!("  --concise              Relatório curto (até 3 tópicos)");
    eprintln!("  --detailed             Relatório com estatísticas e citações diretas");
    eprintln!("  --detail <nível>       concise | standard | detailed");
    eprintln!("  --temperature <T>      Temperatura da geração (padrão: 0.6)");
    eprintln!("  --max-iterations <N>   Máximo de rodadas de busca (padrão: 3)");
    eprintln!("  --verbose              Logs detalhados");
    eprintln!();
    eprintln!("Exemplos:");
    eprintln!("  {} \"Qual é a população do Brasil em 2024?\"", program);
    eprintln!("  {} --offline \"(3 + 4) * 2\"", program);
}

fn stage_label(stage: PipelineStage) -> &'static str {
    match stage {
        PipelineStage::Initializing => "⚙️  Inicializando",
        PipelineStage::LoadingModel => "🧠 Carregando modelo",
        PipelineStage::Planning => "🗺️  Planejando buscas",
        PipelineStage::Searching => "🔍 Buscando",
        PipelineStage::Processing => "📄 Processando resultados",
        PipelineStage::Generating => "✍️  Gerando relatório",
        PipelineStage::Done => "✅ Concluído",
        PipelineStage::Error => "❌ Erro",
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    load_dotenv();

    let args: Vec<String> = std::env::args().collect();
    let program = args.first().cloned().unwrap_or_else(|| "jandive-cli".into());
    let cli = match parse_args(&args[1.min(args.len())..]) {
        Ok(cli) => cli,
        Err(msg) => {
            eprintln!("✗ {}", msg);
            print_usage(&program);
            std::process::exit(2);
        }
    };

    let default_level = if cli.verbose { "info" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .init();

    if cli.query.is_empty() {
        print_usage(&program);
        std::process::exit(1);
    }

    let config = load_app_config();

    eprintln!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    eprintln!(" JANDIVE v{}", jandive::VERSION);
    eprintln!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    eprintln!("Pergunta: {}", cli.query);
    eprintln!();

    // Progresso renderizado em task separada
    let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
    let progress = tokio::spawn(async move {
        while let Some(stage) = rx.recv().await {
            eprintln!("  {}", stage_label(stage));
        }
    });

    let llm = ProviderHandle::Deferred(Arc::new(OpenAiLoader::new(config.llm.clone())));
    let search = Arc::new(DuckDuckGoClient::new()?);
    let fetcher = Arc::new(ContentFetcher::with_reqwest(config.fetcher.clone())?);
    let pipeline = ResearchPipeline::new(config.pipeline.clone(), llm, search, fetcher)
        .with_stage_sink(channel_stage_sink(tx))
        .with_context_window(config.llm.n_ctx);

    let cancel = CancellationToken::new();
    let ctrl_c = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            eprintln!("\n⏹️  Cancelando...");
            ctrl_c.cancel();
        }
    });

    let mut request = ResearchRequest::new(cli.query.clone())
        .offline(cli.offline)
        .detail_level(cli.detail)
        .cancel_token(cancel);
    if let Some(t) = cli.temperature {
        request = request.temperature(t);
    }
    if let Some(n) = cli.max_iterations {
        request = request.max_iterations(n);
    }

    let run = pipeline.run(request).await;
    if let Some(failure) = &run.failure {
        log::error!("❌ {}", failure);
    }

    let sources = run.sources.clone();
    let mut stream = run.stream;
    let mut stdout = std::io::stdout();
    let mut failed = false;

    while let Some(chunk) = stream.next().await {
        match chunk {
            Ok(chunk) => {
                print!("{}", chunk.text);
                stdout.flush()?;
            }
            Err(err) => {
                println!();
                if err.is_network() {
                    eprintln!("✗ Erro de rede durante a geração. Verifique a conexão com o servidor do modelo.");
                } else {
                    eprintln!("✗ {}", err);
                }
                failed = true;
                break;
            }
        }
    }
    println!();

    // Solta o pipeline para fechar o canal de progresso
    drop(stream);
    drop(pipeline);
    let _ = progress.await;

    if !sources.is_empty() {
        println!();
        println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
        println!(" FONTES");
        println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
        for (i, source) in sources.iter().enumerate() {
            println!("  [{}] {}", i + 1, source.display_title());
            println!("      {}", source.url);
        }
    }

    if failed || run.failure.is_some() {
        std::process::exit(1);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_parse_flags_and_query() {
        let cli = parse_args(&args(&[
            "--concise",
            "--max-iterations",
            "2",
            "rust",
            "async",
            "--temperature",
            "0.2",
        ]))
        .unwrap();
        assert_eq!(cli.detail, DetailLevel::Concise);
        assert_eq!(cli.max_iterations, Some(2));
        assert_eq!(cli.temperature, Some(0.2));
        assert_eq!(cli.query, "rust async");
        assert!(!cli.offline);
    }

    #[test]
    fn test_parse_detail_level() {
        let cli = parse_args(&args(&["--detail", "Detailed", "q"])).unwrap();
        assert_eq!(cli.detail, DetailLevel::Detailed);
        let cli = parse_args(&args(&["--detail", "unknown", "q"])).unwrap();
        assert_eq!(cli.detail, DetailLevel::Standard);
    }

    #[test]
    fn test_parse_missing_value() {
        assert!(parse_args(&args(&["--temperature"])).is_err());
        assert!(parse_args(&args(&["--detail"])).is_err());
        assert!(parse_args(&args(&["--max-iterations", "x", "q"])).is_err());
    }
}
