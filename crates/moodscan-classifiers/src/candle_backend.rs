//! Candle backed model collaborators
//!
//! Loads a BERT sequence-classification checkpoint for scoring and a
//! sentence-embedding checkpoint for keyword extraction, either from a local
//! directory or the HuggingFace Hub.

use crate::backend::{
    BackendError, BackendLoader, KeywordExtractor, LoadedBackends, ScaleScores, SentimentScorer,
};
use crate::config::{DeviceSpec, KeywordModelConfig, ModelSource, SentimentModelConfig};
use crate::lexicon::Lexicon;
use candle_core::{DType, Device, IndexOp, Tensor, D};
use candle_nn::{Linear, Module, VarBuilder};
use candle_transformers::models::bert::{BertModel, Config as BertConfig};
use hf_hub::api::sync::ApiBuilder;
use hf_hub::{Repo, RepoType};
use std::path::{Path, PathBuf};
use tokenizers::{Encoding, Tokenizer, TruncationParams};

type BackendResult<T> = std::result::Result<T, BackendError>;

const REQUIRED_FILES: [&str; 3] = ["config.json", "tokenizer.json", "model.safetensors"];

/// Loads the scorer and, when configured, the keyword embedding model
pub struct CandleLoader {
    sentiment: SentimentModelConfig,
    keywords: Option<KeywordModelConfig>,
    cache_dir: PathBuf,
}

impl CandleLoader {
    pub fn new(sentiment: SentimentModelConfig, keywords: Option<KeywordModelConfig>) -> Self {
        let cache_dir = dirs::cache_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("moodscan/models");

        Self {
            sentiment,
            keywords,
            cache_dir,
        }
    }

    pub fn with_cache_dir(mut self, cache_dir: impl Into<PathBuf>) -> Self {
        self.cache_dir = cache_dir.into();
        self
    }

    fn resolve_model_dir(&self, source: &ModelSource) -> BackendResult<PathBuf> {
        match source {
            ModelSource::Local { path } => {
                for file in REQUIRED_FILES {
                    if !path.join(file).exists() {
                        return Err(BackendError::load_failure(format!(
                            "{file} not found in {}",
                            path.display()
                        )));
                    }
                }
                Ok(path.clone())
            }
            ModelSource::HuggingFace { repo, revision } => {
                tracing::info!("Fetching model from HuggingFace: {} @ {}", repo, revision);

                let api = ApiBuilder::new()
                    .with_cache_dir(self.cache_dir.clone())
                    .build()
                    .map_err(|e| {
                        BackendError::load_failure(format!(
                            "Failed to initialize HuggingFace API: {e}"
                        ))
                    })?;

                let repo_obj = api.repo(Repo::with_revision(
                    repo.clone(),
                    RepoType::Model,
                    revision.clone(),
                ));

                let mut model_dir = None;
                for file in REQUIRED_FILES {
                    tracing::debug!("Downloading {}", file);
                    let path = repo_obj.get(file).map_err(|e| {
                        BackendError::load_failure(format!("Failed to download {file}: {e}"))
                    })?;
                    model_dir = path.parent().map(Path::to_path_buf);
                }

                model_dir.ok_or_else(|| BackendError::load_failure("Invalid cache path"))
            }
        }
    }

    fn load_scorer(&self) -> BackendResult<BertSentimentScorer> {
        let config = &self.sentiment;
        let model_dir = self.resolve_model_dir(&config.source)?;
        let device = get_device(config.device)?;

        let tokenizer = load_tokenizer(&model_dir, config.max_length)?;
        let raw_config = read_json(&model_dir.join("config.json"))?;
        let bert_config: BertConfig = serde_json::from_value(raw_config.clone())
            .map_err(|e| BackendError::load_failure(format!("Failed to parse config: {e}")))?;

        let labels = match &config.labels {
            Some(labels) if !labels.is_empty() => labels.clone(),
            _ => labels_from_config(&raw_config)?,
        };

        let vb = load_var_builder(&model_dir, &device)?;
        let model = load_bert_backbone(&vb, &bert_config)?;
        let pooler = load_pooler(&vb, bert_config.hidden_size);
        let classifier = candle_nn::linear(bert_config.hidden_size, labels.len(), vb.pp("classifier"))
            .map_err(|e| {
                BackendError::load_failure(format!(
                    "No classification head in checkpoint ({} labels): {e}",
                    labels.len()
                ))
            })?;

        tracing::info!(
            "Loaded sentiment model {} with labels {:?}",
            config.source.describe(),
            labels
        );

        Ok(BertSentimentScorer {
            name: config.source.describe(),
            tokenizer,
            model,
            pooler,
            classifier,
            device,
            labels,
        })
    }

    fn load_keyword_extractor(&self, config: &KeywordModelConfig) -> BackendResult<EmbeddingKeywordExtractor> {
        let model_dir = self.resolve_model_dir(&config.source)?;
        let device = get_device(self.sentiment.device)?;

        let tokenizer = load_tokenizer(&model_dir, config.max_length)?;
        let raw_config = read_json(&model_dir.join("config.json"))?;
        let bert_config: BertConfig = serde_json::from_value(raw_config)
            .map_err(|e| BackendError::load_failure(format!("Failed to parse config: {e}")))?;

        let vb = load_var_builder(&model_dir, &device)?;
        let model = load_bert_backbone(&vb, &bert_config)?;
        let lexicon = Lexicon::english().map_err(|e| BackendError::load_failure(e.to_string()))?;

        tracing::info!("Loaded keyword model {}", config.source.describe());

        Ok(EmbeddingKeywordExtractor {
            tokenizer,
            model,
            device,
            lexicon,
            max_candidates: config.max_candidates,
        })
    }
}

impl BackendLoader for CandleLoader {
    fn load(&self) -> BackendResult<LoadedBackends> {
        let scorer = self.load_scorer()?;

        let keywords = match &self.keywords {
            Some(config) => match self.load_keyword_extractor(config) {
                Ok(extractor) => Some(Box::new(extractor) as Box<dyn KeywordExtractor>),
                Err(e) => {
                    tracing::warn!("Keyword model unavailable, keywords will be simplified: {}", e);
                    None
                }
            },
            None => None,
        };

        Ok(LoadedBackends {
            scorer: Box::new(scorer),
            keywords,
        })
    }

    fn describe(&self) -> String {
        self.sentiment.source.describe()
    }
}

/// BERT encoder with pooler and classification head
struct BertSentimentScorer {
    name: String,
    tokenizer: Tokenizer,
    model: BertModel,
    pooler: Option<Linear>,
    classifier: Linear,
    device: Device,
    labels: Vec<String>,
}

impl SentimentScorer for BertSentimentScorer {
    fn score(&self, text: &str) -> BackendResult<ScaleScores> {
        let encoding = encode(&self.tokenizer, text)?;
        let (input_ids, token_type_ids, attention_mask) = input_tensors(&encoding, &self.device)?;

        let hidden_states = self
            .model
            .forward(&input_ids, &token_type_ids, Some(&attention_mask))
            .map_err(|e| candle_error("Model forward pass failed", e))?;

        let cls = hidden_states
            .i((.., 0, ..))
            .map_err(|e| candle_error("Failed to get CLS token", e))?;

        let pooled = match &self.pooler {
            Some(pooler) => pooler
                .forward(&cls)
                .and_then(|t| t.tanh())
                .map_err(|e| candle_error("Pooler failed", e))?,
            None => cls,
        };

        let logits = self
            .classifier
            .forward(&pooled)
            .map_err(|e| candle_error("Classification head failed", e))?;

        let probabilities: Vec<f32> = candle_nn::ops::softmax(&logits, D::Minus1)
            .and_then(|t| t.squeeze(0))
            .and_then(|t| t.to_vec1())
            .map_err(|e| candle_error("Softmax failed", e))?;

        ScaleScores::new(self.labels.clone(), probabilities)
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// Ranks candidate phrases by cosine similarity with the whole text in a
/// sentence-embedding space
struct EmbeddingKeywordExtractor {
    tokenizer: Tokenizer,
    model: BertModel,
    device: Device,
    lexicon: Lexicon,
    max_candidates: usize,
}

impl EmbeddingKeywordExtractor {
    fn embed(&self, text: &str) -> BackendResult<Vec<f32>> {
        let encoding = encode(&self.tokenizer, text)?;
        let (input_ids, token_type_ids, attention_mask) = input_tensors(&encoding, &self.device)?;

        let hidden_states = self
            .model
            .forward(&input_ids, &token_type_ids, Some(&attention_mask))
            .map_err(|e| candle_error("Embedding forward pass failed", e))?;

        let sequence: Vec<Vec<f32>> = hidden_states
            .squeeze(0)
            .and_then(|t| t.to_vec2())
            .map_err(|e| candle_error("Failed to read embeddings", e))?;

        Ok(mean_pool_embeddings(&sequence, encoding.get_attention_mask()))
    }
}

impl KeywordExtractor for EmbeddingKeywordExtractor {
    fn extract(&self, text: &str, top_n: usize) -> BackendResult<Vec<String>> {
        let candidates = self.lexicon.candidate_phrases(text, self.max_candidates);
        if candidates.is_empty() || top_n == 0 {
            return Ok(Vec::new());
        }

        let document = self.embed(text)?;
        let mut ranked = Vec::with_capacity(candidates.len());
        for candidate in candidates {
            let embedding = self.embed(&candidate)?;
            ranked.push((candidate, cosine_similarity(&document, &embedding)));
        }

        ranked.sort_by(|a, b| b.1.total_cmp(&a.1));

        Ok(ranked
            .into_iter()
            .take(top_n)
            .map(|(phrase, _)| phrase)
            .collect())
    }
}

fn get_device(device: DeviceSpec) -> BackendResult<Device> {
    match device {
        DeviceSpec::Cpu => Ok(Device::Cpu),
        DeviceSpec::Cuda => Device::new_cuda(0)
            .map_err(|e| BackendError::load_failure(format!("Failed to initialize CUDA: {e}"))),
        DeviceSpec::Metal => Device::new_metal(0)
            .map_err(|e| BackendError::load_failure(format!("Failed to initialize Metal: {e}"))),
    }
}

fn read_json(path: &Path) -> BackendResult<serde_json::Value> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        BackendError::load_failure(format!("Failed to read {}: {e}", path.display()))
    })?;
    serde_json::from_str(&content).map_err(|e| {
        BackendError::load_failure(format!("Failed to parse {}: {e}", path.display()))
    })
}

/// Labels from the checkpoint's `id2label`, ordered by id
fn labels_from_config(config: &serde_json::Value) -> BackendResult<Vec<String>> {
    let id2label = config
        .get("id2label")
        .and_then(|v| v.as_object())
        .ok_or_else(|| BackendError::load_failure("config.json has no id2label"))?;

    let mut labels: Vec<(usize, String)> = id2label
        .iter()
        .filter_map(|(id, label)| Some((id.parse().ok()?, label.as_str()?.to_string())))
        .collect();

    if labels.is_empty() {
        return Err(BackendError::load_failure("config.json id2label is empty"));
    }

    labels.sort_by_key(|(id, _)| *id);
    Ok(labels.into_iter().map(|(_, label)| label).collect())
}

/// Tokenizer that truncates to `max_length` tokens, special tokens included
fn load_tokenizer(model_dir: &Path, max_length: usize) -> BackendResult<Tokenizer> {
    let mut tokenizer = Tokenizer::from_file(model_dir.join("tokenizer.json"))
        .map_err(|e| BackendError::load_failure(format!("Failed to load tokenizer: {e}")))?;
    tokenizer
        .with_truncation(Some(TruncationParams {
            max_length,
            ..Default::default()
        }))
        .map_err(|e| BackendError::load_failure(format!("Invalid truncation settings: {e}")))?;
    Ok(tokenizer)
}

fn load_var_builder(model_dir: &Path, device: &Device) -> BackendResult<VarBuilder<'static>> {
    let weights_path = model_dir.join("model.safetensors");
    let vb = unsafe {
        VarBuilder::from_mmaped_safetensors(&[weights_path], DType::F32, device)
            .map_err(|e| BackendError::load_failure(format!("Failed to load weights: {e}")))?
    };
    Ok(vb)
}

fn load_bert_backbone(vb: &VarBuilder, config: &BertConfig) -> BackendResult<BertModel> {
    let mut errors = Vec::new();

    for prefix in ["bert", ""] {
        let vb_prefix = if prefix.is_empty() {
            vb.clone()
        } else {
            vb.pp(prefix)
        };

        match BertModel::load(vb_prefix, config) {
            Ok(model) => {
                let effective_prefix = if prefix.is_empty() { "<root>" } else { prefix };
                tracing::debug!("Loaded BERT backbone from '{}'", effective_prefix);
                return Ok(model);
            }
            Err(e) => errors.push(format!(
                "{}: {}",
                if prefix.is_empty() { "<root>" } else { prefix },
                e
            )),
        }
    }

    Err(BackendError::load_failure(format!(
        "Failed to load BERT backbone with tried prefixes [{}]",
        errors.join(" | ")
    )))
}

fn load_pooler(vb: &VarBuilder, hidden_size: usize) -> Option<Linear> {
    ["bert.pooler.dense", "pooler.dense"]
        .iter()
        .find_map(|prefix| candle_nn::linear(hidden_size, hidden_size, vb.pp(*prefix)).ok())
}

fn encode(tokenizer: &Tokenizer, text: &str) -> BackendResult<Encoding> {
    tokenizer
        .encode(text, true)
        .map_err(|e| BackendError::inference(format!("Tokenization failed: {e}")))
}

fn input_tensors(encoding: &Encoding, device: &Device) -> BackendResult<(Tensor, Tensor, Tensor)> {
    let tensor = |values: &[u32], what: &str| {
        Tensor::new(values, device)
            .and_then(|t| t.unsqueeze(0))
            .map_err(|e| candle_error(&format!("Failed to create {what} tensor"), e))
    };

    Ok((
        tensor(encoding.get_ids(), "input")?,
        tensor(encoding.get_type_ids(), "token type")?,
        tensor(encoding.get_attention_mask(), "attention mask")?,
    ))
}

/// Allocation failures make the whole model path unusable
fn candle_error(context: &str, err: candle_core::Error) -> BackendError {
    let message = format!("{context}: {err}");
    let lowered = message.to_lowercase();
    if lowered.contains("out of memory") || lowered.contains("out_of_memory") {
        BackendError::out_of_memory(message)
    } else {
        BackendError::inference(message)
    }
}

fn mean_pool_embeddings(sequence_embeddings: &[Vec<f32>], attention_mask: &[u32]) -> Vec<f32> {
    let Some(first) = sequence_embeddings.first() else {
        return Vec::new();
    };

    let mut pooled = vec![0.0f32; first.len()];
    let mut token_count = 0.0f32;

    for (idx, embedding) in sequence_embeddings.iter().enumerate() {
        if attention_mask.get(idx).copied().unwrap_or(0) == 0 {
            continue;
        }
        token_count += 1.0;
        for (acc, value) in pooled.iter_mut().zip(embedding) {
            *acc += value;
        }
    }

    if token_count > 0.0 {
        for value in &mut pooled {
            *value /= token_count;
        }
    }

    pooled
}

fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        0.0
    } else {
        dot / (norm_a * norm_b)
    }
}
