use std::sync::Arc;

use anyhow::{anyhow, Result};
use rocket::http::Status;
use rocket::serde::json::Json;
use rocket::{get, routes, Build, Rocket, State};
use rocket_cors::CorsOptions;
use serde_json::{json, Value};

use suru_backend::app_settings::AppSettings;
use suru_backend::lexeme_creator::{add_lexeme, AddLexemeRequest};
use suru_backend::logger::{info, error};
use suru_backend::wikidata::{LexemeStore, WikidataClient};

const REQUIRED_PARAMS: [&str; 3] = ["lang", "lemma", "category"];
const OPTIONAL_PARAMS: [&str; 3] = ["suru_id", "sv_gloss", "betydelse_objekt"];

pub struct ApiState {
    pub store: Arc<dyn LexemeStore + Send + Sync>,
    pub example_url: String,
}

fn present(value: &Option<String>) -> Option<String> {
    value.as_deref()
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .map(|s| s.to_string())
}

#[get("/")]
fn index(state: &State<ApiState>) -> Json<Value> {
    Json(json!({
        "message": "Suru Wikidata Lexeme Creator API",
        "usage": {
            "endpoint": "/add",
            "method": "GET",
            "required_parameters": REQUIRED_PARAMS,
            "optional_parameters": OPTIONAL_PARAMS,
            "example": state.example_url,
        }
    }))
}

#[allow(clippy::too_many_arguments)]
#[get("/add?<lang>&<lemma>&<category>&<suru_id>&<sv_gloss>&<betydelse_objekt>")]
async fn add(
    lang: Option<String>,
    lemma: Option<String>,
    category: Option<String>,
    suru_id: Option<String>,
    sv_gloss: Option<String>,
    betydelse_objekt: Option<String>,
    state: &State<ApiState>,
) -> (Status, Json<Value>) {
    let (lang, lemma, category) = match (present(&lang), present(&lemma), present(&category)) {
        (Some(lang), Some(lemma), Some(category)) => (lang, lemma, category),
        _ => {
            return (Status::BadRequest, Json(json!({
                "error": "Missing required parameters. Required: lang, lemma, category. Optional: suru_id, sv_gloss, betydelse_objekt"
            })));
        }
    };

    let req = AddLexemeRequest {
        lang,
        lemma,
        category,
        suru_id: present(&suru_id),
        sv_gloss: present(&sv_gloss),
        sense_item: present(&betydelse_objekt),
    };
    info(&format!("add(): {}:{} ({})", req.lang, req.lemma, req.category));

    let store = state.store.clone();
    let task_req = req.clone();
    let outcome = rocket::tokio::task::spawn_blocking(move || add_lexeme(store.as_ref(), &task_req)).await;

    let result = match outcome {
        Ok(Ok(result)) => result,
        Ok(Err(e)) => return server_error(e.to_string()),
        Err(e) => return server_error(format!("Task failed: {}", e)),
    };

    (Status::Ok, Json(json!({
        "success": true,
        "message": format!("Successfully processed lexeme: {}:{} ({})", req.lang, req.lemma, req.category),
        "lexeme_id": result.lexeme_id,
        "lexeme_url": result.lexeme_url,
        "lexeme_created": result.lexeme_created,
        "claim_added": result.claim_added,
        "sense_added": result.sense_added,
        "parameters": {
            "lang": req.lang,
            "lemma": req.lemma,
            "category": req.category,
            "suru_id": req.suru_id,
            "sv_gloss": req.sv_gloss,
            "betydelse_objekt": req.sense_item,
        }
    })))
}

fn server_error(message: String) -> (Status, Json<Value>) {
    error(&format!("add(): {}", message));
    (Status::InternalServerError, Json(json!({
        "error": message,
        "message": "An error occurred while processing the request",
    })))
}

pub fn build_rocket(settings: &AppSettings, store: Arc<dyn LexemeStore + Send + Sync>) -> Result<Rocket<Build>> {
    let cors = CorsOptions::default()
        .to_cors()
        .map_err(|e| anyhow!("Cors options error: {}", e))?;

    let config = rocket::Config::figment()
        .merge(("log_level", rocket::config::LogLevel::Off))
        .merge(("address", settings.api_address.clone()))
        .merge(("port", settings.api_port));

    let example_url = format!(
        "http://localhost:{}/add?lang=fi&lemma=haaste&category=noun&suru_id=SURU_7107788c441b76dfdb12e2eb7ab5a1a2&sv_gloss=utmaning&betydelse_objekt=Q16511806",
        settings.api_port
    );

    Ok(rocket::custom(config)
        .attach(cors)
        .mount("/", routes![index, add])
        .manage(ApiState { store, example_url }))
}

/// Serves the lexeme creator until the process is stopped.
pub fn start_webserver(settings: &AppSettings) -> Result<()> {
    info("start_webserver()");
    let client = WikidataClient::new(settings.wikidata.clone())?;
    let rocket = build_rocket(settings, Arc::new(client))?;

    info(&format!("Server will be available at: http://{}:{}", settings.api_address, settings.api_port));

    rocket::execute(rocket.launch())
        .map_err(|e| anyhow!("Webserver error: {}", e))?;

    Ok(())
}
