use anyhow::Result;
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;

use collection_operators::schema::SchemaProvider;
use collection_operators::{AppConfig, CollectionCompiler, QueryParams, SelectQuery};

const CONFIG_FILE: &str = "collection_config.json";

/// 加载配置，优先使用命令行参数或默认路径的JSON配置，失败时使用演示配置
fn load_config() -> Result<AppConfig> {
    let path = std::env::args().nth(1).unwrap_or_else(|| CONFIG_FILE.to_string());
    match AppConfig::from_json_file(&path) {
        Ok(config) => {
            println!("✅ 成功从JSON配置文件加载: {}", path);
            Ok(config)
        }
        Err(e) => {
            println!("⚠️ 无法加载JSON配置文件 ({}), 使用演示配置", e);
            Ok(AppConfig::demo()?)
        }
    }
}

fn init_logging() {
    let filter = std::env::var("RUST_LOG").unwrap_or_else(|_| "warn".to_string());
    tracing_subscriber::fmt()
        .with_target(false)
        .compact()
        .with_env_filter(filter)
        .init();
}

/// 控制台会话中累积的请求参数
struct Session {
    entity: String,
    params: QueryParams,
}

impl Session {
    fn set(&mut self, command: &str, arg: Option<String>) -> bool {
        match command {
            "entity" => {
                if let Some(entity) = arg {
                    self.entity = entity;
                }
            }
            "filter" => self.params.filter = arg,
            "order" => self.params.order_by = arg,
            "fields" => self.params.fields = arg,
            "exclude" => self.params.exclude_fields = arg,
            "offset" => self.params.offset = arg,
            "limit" => self.params.limit = arg,
            _ => return false,
        }
        true
    }
}

fn print_help() {
    println!("命令:");
    println!("  entity <名称>          设置目标实体");
    println!("  filter <表达式>        例如: name == \"a\" and not age > 5");
    println!("  order <排序>           例如: created_at desc, owner.name");
    println!("  fields <字段列表>      例如: name,owner.name");
    println!("  exclude <字段列表>     反向字段选择");
    println!("  offset <n> / limit <n> 分页");
    println!("  show                   显示当前请求");
    println!("  run                    编译并输出 SQL");
    println!("  clear                  清空请求参数");
    println!("  quit                   退出");
    println!("不带参数的设置命令会清除对应参数。");
}

fn run(compiler: &CollectionCompiler<'_>, schema: &dyn SchemaProvider, session: &Session) {
    let Some(entity) = schema.entity(&session.entity) else {
        println!("✗ 未知实体: {}", session.entity);
        return;
    };

    match compiler.apply_collection_operators(SelectQuery::new(&entity.table), &session.params, &session.entity) {
        Ok(query) => {
            let (sql, values) = query.build();
            println!("\n[生成的 SQL]:\n{}", sql);
            println!("\n[绑定参数]:");
            for (i, value) in values.0.iter().enumerate() {
                println!("  ${} = {:?}", i + 1, value);
            }
            if !query.preloads().is_empty() {
                println!("\n[预加载关联]: {}", query.preloads().join(", "));
            }
        }
        Err(e) => println!("✗ 编译失败: {}", e),
    }
}

fn main() -> Result<()> {
    init_logging();
    println!("--- Collection Operators: 请求到 SQL 编译器 ---");

    let config = load_config()?;
    let entities: Vec<_> = config.schema.entity_names().collect();
    println!("加载了 {} 个实体: {}", entities.len(), entities.join(", "));

    let compiler = CollectionCompiler::from_config(&config.schema, config.compiler.clone());
    let mut session = Session {
        entity: entities.first().map(|e| e.to_string()).unwrap_or_default(),
        params: QueryParams::default(),
    };
    print_help();

    let mut editor = DefaultEditor::new()?;
    loop {
        let line = match editor.readline(&format!("{}> ", session.entity)) {
            Ok(line) => line,
            Err(ReadlineError::Interrupted | ReadlineError::Eof) => break,
            Err(e) => return Err(e.into()),
        };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        editor.add_history_entry(line)?;

        let (command, rest) = match line.split_once(char::is_whitespace) {
            Some((command, rest)) => (command, Some(rest.trim().to_string())),
            None => (line, None),
        };

        match command {
            "quit" | "exit" => break,
            "help" => print_help(),
            "show" => println!("{} {:#?}", session.entity, session.params),
            "clear" => session.params = QueryParams::default(),
            "run" => run(&compiler, &config.schema, &session),
            _ => {
                if !session.set(command, rest.filter(|r| !r.is_empty())) {
                    println!("未知命令: {}，输入 help 查看帮助", command);
                }
            }
        }
    }

    Ok(())
}
