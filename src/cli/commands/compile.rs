use clap::Args;
use serde_json::json;

use crate::cli::OutputFormat;
use crate::query::{compile, CacheScope, Predicate, Query, QueryParams, Relation, SecurityContext};

#[derive(Args, Debug, Default)]
pub struct CompileArgs {
    #[arg(long, help = "Relation as schema.table or table")]
    pub relation: String,

    #[arg(long, help = "Comma-separated columns (default *)")]
    pub select: Option<String>,

    #[arg(long = "where", value_name = "KEY=VALUE", help = "Filter in URL form, e.g. name=Boot, price[gt]=10, id[in]=1,2 (repeatable)")]
    pub filters: Vec<String>,

    #[arg(long, help = "ORDER BY list, e.g. \"created_at desc,name\"")]
    pub order_by: Option<String>,

    #[arg(long)]
    pub limit: Option<u64>,

    #[arg(long, help = "Fetch a single record by id")]
    pub record: Option<String>,

    #[arg(long, help = "Return a JSON array instead of one object")]
    pub list: bool,

    #[arg(long, help = "Role to switch to")]
    pub role: Option<String>,

    #[arg(long, help = "Value for my.user_id")]
    pub user_id: Option<String>,

    #[arg(long, help = "Cache scope: none, pre_role, post_role, post_user")]
    pub cache_scope: Option<String>,
}

pub fn handle(args: CompileArgs, output_format: OutputFormat) -> anyhow::Result<()> {
    let query = build_query(args)?;
    let compiled = compile(&query)?;

    match output_format {
        OutputFormat::Json => {
            let out = json!({
                "sql": compiled.sql,
                "cache_key": compiled.cache_key,
            });
            println!("{}", serde_json::to_string_pretty(&out)?);
        }
        OutputFormat::Text => println!("{}", compiled.sql),
    }
    Ok(())
}

fn build_query(args: CompileArgs) -> anyhow::Result<Query> {
    let relation = Relation::parse(&args.relation);
    let mut query = if args.list || args.record.is_none() {
        Query::list(relation)
    } else {
        Query::single(relation)
    };
    if let Some(record) = &args.record {
        query = query.filter(Predicate::eq("id", record.as_str()));
    }

    let mut pairs = Vec::new();
    if let Some(select) = args.select {
        pairs.push(("select".to_string(), select));
    }
    for filter in &args.filters {
        let (key, value) = filter
            .split_once('=')
            .ok_or_else(|| anyhow::anyhow!("--where expects KEY=VALUE, got {:?}", filter))?;
        pairs.push((key.to_string(), value.to_string()));
    }
    if let Some(order_by) = args.order_by {
        pairs.push(("orderby".to_string(), order_by));
    }
    query = QueryParams::parse(&pairs)?.apply(query);
    if let Some(limit) = args.limit {
        query = query.limit(limit);
    }

    let scope = match args.cache_scope.as_deref() {
        Some(s) => s.parse::<CacheScope>().map_err(|e| anyhow::anyhow!(e))?,
        None => CacheScope::None,
    };

    Ok(query
        .scoped(SecurityContext::new(
            args.role.unwrap_or_default(),
            args.user_id.unwrap_or_default(),
        ))
        .cached(scope))
}
