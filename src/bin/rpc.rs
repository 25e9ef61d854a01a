//! `luminary-rpc` — line-delimited JSON-RPC 2.0 front end over stdin/stdout.
//!
//! Method names are `Service.Method`: `VersionService.Get`,
//! `ProvidersService.List`, `SearchService.Search`, `ListService.List`,
//! `InfoService.Get`, `DownloadService.Download`. Parameters arrive as a
//! single object wrapped in a one-element array, a quirk of the framing this
//! mirrors. `-32600/-32601/-32602/-32700` are reserved for framing errors;
//! `SearchService.Search`/`ListService.List`/`InfoService.Get` surface
//! business failures as JSON-RPC errors (positive code), while
//! `DownloadService.Download` surfaces them as a `{success:false, message}`
//! payload so a client can observe a failed chapter without losing the
//! request id.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

use luminary::error::TrackedError;
use luminary::prelude::*;
use luminary::types::split_combined_id;

const PARSE_ERROR: i64 = -32700;
const INVALID_REQUEST: i64 = -32600;
const METHOD_NOT_FOUND: i64 = -32601;
const INVALID_PARAMS: i64 = -32602;
const BUSINESS_ERROR: i64 = 1;

#[derive(Deserialize)]
struct RpcRequest {
    #[serde(default)]
    id: Value,
    method: String,
    #[serde(default)]
    params: Value,
}

#[derive(Serialize)]
struct RpcResponse {
    jsonrpc: &'static str,
    id: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<RpcError>,
}

#[derive(Serialize)]
struct RpcError {
    code: i64,
    message: String,
}

fn ok(id: Value, result: Value) -> RpcResponse {
    RpcResponse { jsonrpc: "2.0", id, result: Some(result), error: None }
}

fn err(id: Value, code: i64, message: impl Into<String>) -> RpcResponse {
    RpcResponse { jsonrpc: "2.0", id, result: None, error: Some(RpcError { code, message: message.into() }) }
}

/// Unwraps the `[{...}]` single-object-in-array param framing.
fn first_param(params: &Value) -> Option<&Value> {
    params.as_array().and_then(|a| a.first())
}

fn build_registry() -> Registry {
    let registry = Registry::new();
    #[cfg(feature = "provider-mangadex")]
    let _ = registry.register(Arc::new(luminary::providers::MangaDexProvider::new()));
    #[cfg(feature = "provider-kissmanga")]
    let _ = registry.register(Arc::new(luminary::providers::KissMangaProvider::new()));
    registry
}

#[tokio::main]
async fn main() {
    let _guard = luminary::logging::init(false);
    let registry = build_registry();

    let stdin = tokio::io::stdin();
    let mut lines = BufReader::new(stdin).lines();
    let mut stdout = tokio::io::stdout();

    while let Ok(Some(line)) = lines.next_line().await {
        if line.trim().is_empty() {
            continue;
        }

        let response = match serde_json::from_str::<RpcRequest>(&line) {
            Ok(request) => handle(&registry, request).await,
            Err(e) => err(Value::Null, PARSE_ERROR, format!("parse error: {e}")),
        };

        let rendered = serde_json::to_string(&response).unwrap_or_else(|e| {
            json!({"jsonrpc": "2.0", "id": null, "error": {"code": PARSE_ERROR, "message": e.to_string()}}).to_string()
        });
        if stdout.write_all(rendered.as_bytes()).await.is_err() {
            break;
        }
        if stdout.write_all(b"\n").await.is_err() {
            break;
        }
        let _ = stdout.flush().await;
    }
}

async fn handle(registry: &Registry, request: RpcRequest) -> RpcResponse {
    let RpcRequest { id, method, params } = request;

    if method.is_empty() {
        return err(id, INVALID_REQUEST, "missing method");
    }

    match method.as_str() {
        "VersionService.Get" => ok(id, json!({"version": env!("CARGO_PKG_VERSION")})),
        "ProvidersService.List" => {
            let providers: Vec<Value> = registry
                .list()
                .iter()
                .map(|p| json!({"id": p.id(), "name": p.name(), "description": p.description(), "siteUrl": p.site_url()}))
                .collect();
            ok(id, json!(providers))
        }
        "SearchService.Search" => search(registry, id, &params).await,
        "ListService.List" => list(registry, id, &params).await,
        "InfoService.Get" => info(registry, id, &params).await,
        "DownloadService.Download" => download(registry, id, &params).await,
        other => err(id, METHOD_NOT_FOUND, format!("unknown method: {other}")),
    }
}

fn as_business_error(id: Value, e: TrackedError) -> RpcResponse {
    err(id, BUSINESS_ERROR, e.to_string())
}

async fn search(registry: &Registry, id: Value, params: &Value) -> RpcResponse {
    let Some(p) = first_param(params) else {
        return err(id, INVALID_PARAMS, "expected a single params object");
    };
    let Some(query) = p.get("query").and_then(Value::as_str) else {
        return err(id, INVALID_PARAMS, "missing required field: query");
    };
    let limit = p.get("limit").and_then(Value::as_u64).unwrap_or(0) as usize;
    let provider_id = p.get("provider").and_then(Value::as_str);

    let builder = registry.search(query).limit(limit);
    let result = match provider_id {
        Some(provider_id) => builder.from_provider(provider_id).await,
        None => builder.flatten().await,
    };

    match result {
        Ok(manga) => ok(id, json!(manga)),
        Err(e) => as_business_error(id, TrackedError::from(e)),
    }
}

async fn list(registry: &Registry, id: Value, params: &Value) -> RpcResponse {
    let limit = first_param(params)
        .and_then(|p| p.get("limit"))
        .and_then(Value::as_u64)
        .unwrap_or(0) as usize;
    let provider_id = first_param(params).and_then(|p| p.get("provider")).and_then(Value::as_str);

    let builder = registry.search("").limit(limit);
    let result = match provider_id {
        Some(provider_id) => builder.from_provider(provider_id).await,
        None => builder.flatten().await,
    };

    match result {
        Ok(manga) => ok(id, json!(manga)),
        Err(e) => as_business_error(id, TrackedError::from(e)),
    }
}

async fn info(registry: &Registry, id: Value, params: &Value) -> RpcResponse {
    let Some(combined) = first_param(params).and_then(|p| p.get("id")).and_then(Value::as_str) else {
        return err(id, INVALID_PARAMS, "missing required field: id");
    };
    let Some((provider_id, manga_id)) = split_combined_id(combined) else {
        return err(id, INVALID_PARAMS, format!("expected providerId:mangaId, got {combined}"));
    };

    let provider = match registry.get(provider_id) {
        Ok(p) => p,
        Err(e) => return as_business_error(id, e),
    };

    match provider.get_manga(manga_id).await {
        Ok(info) => ok(id, json!(info)),
        Err(e) => as_business_error(id, e),
    }
}

async fn download(registry: &Registry, id: Value, params: &Value) -> RpcResponse {
    let Some(p) = first_param(params) else {
        return err(id, INVALID_PARAMS, "expected a single params object");
    };
    let Some(combined) = p.get("id").and_then(Value::as_str) else {
        return err(id, INVALID_PARAMS, "missing required field: id");
    };
    let output = p
        .get("output")
        .and_then(Value::as_str)
        .map(std::path::PathBuf::from)
        .unwrap_or_else(|| std::path::PathBuf::from("./downloads"));

    let Some((provider_id, chapter_id)) = split_combined_id(combined) else {
        return ok(id, json!({"success": false, "message": format!("expected providerId:chapterId, got {combined}")}));
    };

    let provider = match registry.get(provider_id) {
        Ok(p) => p,
        Err(e) => return ok(id, json!({"success": false, "message": e.to_string()})),
    };

    let options = luminary::provider::DownloadOptions {
        concurrency: p.get("concurrency").and_then(Value::as_u64).map(|n| n as usize),
        volume: p.get("vol").and_then(Value::as_str).map(str::to_string),
    };

    match provider.download_chapter(chapter_id, &output, &options).await {
        Ok(path) => ok(id, json!({"success": true, "path": path.display().to_string()})),
        Err(e) => ok(id, json!({"success": false, "message": e.to_string()})),
    }
}
