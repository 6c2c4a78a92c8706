use crate::captions::CaptionPlan;
use crate::domain::TextModel;
use crate::errors::{GenerateError, ModelError};
use crate::templates::Catalog;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;

/// Maximum number of model rounds per generation request. Bounds the
/// tool-call loop so a stalling model always terminates.
const MAX_MODEL_STEPS: usize = 5;

const GENERATE_MEME_TOOL: &str = "generate_meme";

// --- Model wire format (Gemini generateContent) ---

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Content {
    #[serde(default)]
    pub role: String,
    #[serde(default)]
    pub parts: Vec<Part>,
}

impl Content {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            parts: vec![Part::text(text)],
        }
    }

    fn function_results(parts: Vec<Part>) -> Self {
        Self {
            role: "function".to_string(),
            parts,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Part {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub function_call: Option<FunctionCall>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub function_response: Option<FunctionResponse>,
}

impl Part {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            ..Self::default()
        }
    }

    pub fn function_call(name: impl Into<String>, args: serde_json::Value) -> Self {
        Self {
            function_call: Some(FunctionCall {
                name: name.into(),
                args,
            }),
            ..Self::default()
        }
    }

    fn function_response(name: String, response: serde_json::Value) -> Self {
        Self {
            function_response: Some(FunctionResponse { name, response }),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FunctionCall {
    pub name: String,
    #[serde(default)]
    pub args: serde_json::Value,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FunctionResponse {
    pub name: String,
    pub response: serde_json::Value,
}

/// Declaration of a callable tool, in the schema shape the model API expects.
#[derive(Debug, Clone, Serialize)]
pub struct FunctionDeclaration {
    pub name: &'static str,
    pub description: &'static str,
    pub parameters: serde_json::Value,
}

// --- Gemini REST client ---

pub const DEFAULT_GEMINI_BASE: &str = "https://generativelanguage.googleapis.com";
pub const DEFAULT_GEMINI_MODEL: &str = "gemini-1.5-flash";

/// `TextModel` implementation backed by the Gemini `generateContent` REST
/// endpoint.
#[derive(Debug, Clone)]
pub struct GeminiModel {
    http: reqwest::Client,
    base_url: String,
    model: String,
    api_key: String,
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<Content>,
}

impl GeminiModel {
    pub fn new(api_key: String, base_url: String, model: String) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url,
            model,
            api_key,
        }
    }
}

#[async_trait::async_trait]
impl TextModel for GeminiModel {
    async fn step(
        &self,
        contents: &[Content],
        tools: &[FunctionDeclaration],
    ) -> Result<Content, ModelError> {
        let url = format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url.trim_end_matches('/'),
            self.model
        );
        let payload = json!({
            "contents": contents,
            "tools": [{ "functionDeclarations": tools }],
            "generationConfig": { "temperature": 1.0 },
        });

        let response = self
            .http
            .post(&url)
            .query(&[("key", self.api_key.as_str())])
            .json(&payload)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(ModelError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let body: GenerateContentResponse = response.json().await?;
        body.candidates
            .into_iter()
            .next()
            .and_then(|candidate| candidate.content)
            .ok_or(ModelError::EmptyReply)
    }
}

// --- Orchestrator ---

/// A finished generation: the normalized caption plan, the rendering URL and
/// the model's closing commentary.
#[derive(Debug, Clone)]
pub struct GeneratedMeme {
    pub plan: CaptionPlan,
    pub meme_url: String,
    pub message: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateMemeArgs {
    template_id: String,
    #[serde(default)]
    text_lines: Vec<String>,
}

/// Drives the model tool-call loop that turns a free-text prompt into a
/// renderable meme.
pub struct MemeGenerator {
    model: Arc<dyn TextModel>,
    catalog: Arc<Catalog>,
}

impl MemeGenerator {
    pub fn new(model: Arc<dyn TextModel>, catalog: Arc<Catalog>) -> Self {
        Self { model, catalog }
    }

    /// Generates a meme for `prompt`.
    ///
    /// The first tool invocation that yields a renderable payload wins; the
    /// loop still reports every tool result back to the model so it can
    /// finish its commentary. A single model failure surfaces to the caller
    /// unretried, and exhausting the step budget without a successful tool
    /// call fails with `NoMemeGenerated` — never a partial URL.
    pub async fn generate(&self, prompt: &str) -> Result<GeneratedMeme, GenerateError> {
        let tools = meme_tool_declarations();
        let mut contents = vec![Content::user(self.instructions(prompt))];
        let mut generated: Option<(CaptionPlan, String)> = None;
        let mut commentary = String::new();

        for _ in 0..MAX_MODEL_STEPS {
            let reply = self.model.step(&contents, &tools).await?;

            for part in &reply.parts {
                if let Some(text) = &part.text {
                    if !text.trim().is_empty() {
                        commentary = text.trim().to_string();
                    }
                }
            }
            let calls: Vec<FunctionCall> = reply
                .parts
                .iter()
                .filter_map(|part| part.function_call.clone())
                .collect();
            contents.push(reply);

            if calls.is_empty() {
                break;
            }

            let mut results = Vec::with_capacity(calls.len());
            for FunctionCall { name, args } in calls {
                let payload = if name == GENERATE_MEME_TOOL {
                    let (payload, outcome) = self.run_meme_tool(args);
                    if generated.is_none() {
                        generated = outcome;
                    }
                    payload
                } else {
                    tracing::warn!(tool = %name, "Model invoked an undeclared tool");
                    json!({ "error": format!("unknown tool: {name}") })
                };
                results.push(Part::function_response(name, payload));
            }
            contents.push(Content::function_results(results));
        }

        let (plan, meme_url) = generated.ok_or(GenerateError::NoMemeGenerated)?;
        tracing::info!(template_id = %plan.template_id, meme_url = %meme_url, "Meme generated");
        Ok(GeneratedMeme {
            plan,
            meme_url,
            message: commentary,
        })
    }

    /// Executes one `generate_meme` invocation.
    ///
    /// Returns the payload to report back to the model and, when the
    /// arguments were usable, the captured plan/URL pair. An unknown template
    /// id falls back to a uniformly random catalog entry, and line counts are
    /// reconciled against the resolved template either way.
    fn run_meme_tool(
        &self,
        raw_args: serde_json::Value,
    ) -> (serde_json::Value, Option<(CaptionPlan, String)>) {
        let args: GenerateMemeArgs = match serde_json::from_value(raw_args) {
            Ok(args) => args,
            Err(e) => {
                tracing::warn!(error = %e, "Model sent malformed generate_meme arguments");
                return (json!({ "error": format!("invalid arguments: {e}") }), None);
            }
        };

        let template = match self.catalog.get(&args.template_id) {
            Some(template) => template,
            None => {
                let fallback = self.catalog.random();
                tracing::warn!(
                    requested = %args.template_id,
                    fallback = %fallback.id,
                    "Template id not found, using a random template as fallback"
                );
                fallback
            }
        };

        let plan = CaptionPlan::new(template, args.text_lines);
        match plan.url() {
            Ok(url) => {
                tracing::debug!(template_id = %plan.template_id, meme_url = %url, "Generated meme URL");
                let payload = json!({
                    "memeUrl": url,
                    "templateId": plan.template_id,
                    "textLines": plan.lines,
                });
                (payload, Some((plan, url)))
            }
            Err(e) => (json!({ "error": e.to_string() }), None),
        }
    }

    fn instructions(&self, prompt: &str) -> String {
        format!(
            "Based on this prompt: \"{prompt}\", generate a creative and funny meme. \
Select the meme template and caption text that fit best with both the template and the prompt.\n\
\n\
Instructions:\n\
1. Analyze the prompt for the specific emotion, situation, or cultural reference it describes.\n\
2. Choose the template that BEST MATCHES the scenario, emotional tone, or logical structure of the prompt.\n\
3. IMPORTANT: do NOT default to popular templates like \"Distracted Boyfriend\", \"Drake\" or \"Change My Mind\" simply because they are well known.\n\
4. Prioritize template-content fit over template popularity: match the emotional reaction being expressed, the number of entities being compared, and the type of situation (irony, realization, frustration, comparison).\n\
5. The \"lines\" field states how many text lines a template supports; provide exactly that many.\n\
6. Study the \"example\" field to understand how each template is typically used.\n\
7. Write witty caption lines that connect the template's intended use with the prompt.\n\
\n\
Here are all available templates:\n\
{summary}\n\
\n\
After selecting a template, call the {tool} tool with the chosen template id and exactly the required number of text lines.",
            prompt = prompt,
            summary = self.catalog.summary(),
            tool = GENERATE_MEME_TOOL,
        )
    }
}

fn meme_tool_declarations() -> Vec<FunctionDeclaration> {
    vec![FunctionDeclaration {
        name: GENERATE_MEME_TOOL,
        description: "Generate a meme based on the user prompt",
        parameters: json!({
            "type": "object",
            "properties": {
                "templateId": {
                    "type": "string",
                    "description": "ID of the meme template"
                },
                "textLines": {
                    "type": "array",
                    "items": { "type": "string" },
                    "description": "Text lines for the meme, matching the template line requirements"
                }
            },
            "required": ["templateId", "textLines"]
        }),
    }]
}
