//! HTTP handler for KYC submissions.
//!
//! Submissions arrive either as a JSON body or as `multipart/form-data`. A multipart submission
//! carries the form either as a JSON `payload` field or as flat fields (`customer_email`,
//! `owners[0][first_name]`, ...), plus optional files named `owners[N][proof_of_id]` and
//! `owners[N][proof_of_address]`. Both encodings are parsed once into a
//! [`KycSubmissionRequest`] and a list of [`UploadedDocument`]s.

use axum::{
    Json,
    extract::{FromRequest, Multipart, Request, State, multipart::Field},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use chrono::Utc;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use tracing::{instrument, warn};

use crate::{
    AppState,
    api::models::kyc::{KycSubmissionRequest, KycSubmissionResponse, UploadedDocument},
    db::models::{member_documents::DocumentKind, subscriptions::PartnerStatus},
    errors::{Error, Result},
    kyc::{
        forwarding::{ForwardOutcome, forward_subscription},
        submission::persist_submission,
        validation::{validate_documents, validate_submission},
    },
};

const SUBMITTED_MESSAGE: &str = "KYC submitted successfully";
const FORWARD_FAILED_MESSAGE: &str = "KYC submitted, but it could not be passed to our partner. It has been saved and will be retried.";

/// A parsed submission with any uploaded documents.
#[derive(Debug)]
pub struct KycRequest {
    pub submission: KycSubmissionRequest,
    pub documents: Vec<UploadedDocument>,
}

impl FromRequest<AppState> for KycRequest {
    type Rejection = Error;

    async fn from_request(req: Request, state: &AppState) -> Result<Self> {
        let is_multipart = req
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|v| v.starts_with("multipart/form-data"));

        if !is_multipart {
            let Json(submission) = Json::<KycSubmissionRequest>::from_request(req, state)
                .await
                .map_err(|e| Error::BadRequest {
                    message: format!("Invalid submission body: {}", e.body_text()),
                })?;
            return Ok(Self {
                submission,
                documents: Vec::new(),
            });
        }

        let multipart = Multipart::from_request(req, state).await.map_err(|e| Error::BadRequest {
            message: format!("Invalid multipart body: {}", e.body_text()),
        })?;

        parse_multipart(multipart, state.config.kyc.max_document_size).await
    }
}

/// Split `owners[3][first_name]` into `(3, "first_name")`. `owner[..]` and `members[..]` are
/// accepted as aliases.
fn parse_owner_field(name: &str) -> Option<(usize, &str)> {
    let rest = ["owners[", "owner[", "members["].iter().find_map(|prefix| name.strip_prefix(prefix))?;
    let (index, rest) = rest.split_once("][")?;
    let field = rest.strip_suffix(']')?;
    Some((index.parse().ok()?, field))
}

async fn read_document(mut field: Field<'_>, owner_index: usize, kind: DocumentKind, max_size: usize) -> Result<UploadedDocument> {
    let filename = field.file_name().map(str::to_string);
    let content_type = field.content_type().map(str::to_string);

    let mut content = Vec::new();
    while let Some(chunk) = field.chunk().await.map_err(|e| Error::BadRequest {
        message: format!("Failed to read uploaded document: {e}"),
    })? {
        if content.len() + chunk.len() > max_size {
            return Err(Error::PayloadTooLarge {
                message: format!(
                    "Document {} for owner {} exceeds the maximum size of {} bytes",
                    kind.as_str(),
                    owner_index + 1,
                    max_size
                ),
            });
        }
        content.extend_from_slice(&chunk);
    }

    Ok(UploadedDocument {
        owner_index,
        kind,
        filename,
        content_type,
        content,
    })
}

async fn read_text(field: Field<'_>) -> Result<String> {
    field.text().await.map_err(|e| Error::BadRequest {
        message: format!("Failed to read form field: {e}"),
    })
}

async fn parse_multipart(mut multipart: Multipart, max_document_size: usize) -> Result<KycRequest> {
    let mut payload: Option<KycSubmissionRequest> = None;
    let mut fields = Map::new();
    let mut owners: BTreeMap<usize, Map<String, Value>> = BTreeMap::new();
    let mut documents = Vec::new();

    while let Some(field) = multipart.next_field().await.map_err(|e| Error::BadRequest {
        message: format!("Invalid multipart body: {e}"),
    })? {
        let Some(name) = field.name().map(str::to_string) else {
            continue;
        };

        if name == "payload" {
            let text = read_text(field).await?;
            let parsed = serde_json::from_str(&text).map_err(|e| Error::BadRequest {
                message: format!("Invalid submission payload: {e}"),
            })?;
            payload = Some(parsed);
            continue;
        }

        match parse_owner_field(&name) {
            Some((index, suffix)) => {
                if let Some(kind) = DocumentKind::from_field_name(suffix) {
                    documents.push(read_document(field, index, kind, max_document_size).await?);
                } else {
                    let suffix = suffix.to_string();
                    let value = read_text(field).await?;
                    owners.entry(index).or_default().insert(suffix, Value::String(value));
                }
            }
            None => {
                let value = read_text(field).await?;
                // Form fields are strings; product_id is the only numeric one
                let value = match name.as_str() {
                    "product_id" if value.trim().is_empty() => Value::Null,
                    "product_id" => value
                        .trim()
                        .parse::<i64>()
                        .map(Value::from)
                        .map_err(|_| Error::BadRequest {
                            message: "product_id must be a number".to_string(),
                        })?,
                    _ => Value::String(value),
                };
                fields.insert(name, value);
            }
        }
    }

    let submission = match payload {
        Some(submission) => submission,
        None => {
            if let Some((&last, _)) = owners.last_key_value()
                && last >= owners.len()
            {
                return Err(Error::BadRequest {
                    message: format!("Owner fields are not numbered consecutively from 0 (found owner index {last})"),
                });
            }
            fields.insert(
                "members".to_string(),
                Value::Array(owners.into_values().map(Value::Object).collect()),
            );
            serde_json::from_value(Value::Object(fields)).map_err(|e| Error::BadRequest {
                message: format!("Invalid submission fields: {e}"),
            })?
        }
    };

    Ok(KycRequest { submission, documents })
}

/// Submit the KYC form.
#[utoipa::path(
    post,
    path = "/api/submit-kyc",
    tag = "kyc",
    summary = "Submit KYC",
    description = "Validate and store a KYC submission, consume its token, and forward the subscription to the partner. \
Accepts `application/json` or `multipart/form-data` with owner documents. If forwarding fails the submission is kept and a 502 is returned.",
    request_body(content = KycSubmissionRequest, description = "Submission form", content_type = "application/json"),
    responses(
        (status = 201, description = "Submission stored", body = KycSubmissionResponse),
        (status = 400, description = "Validation failed"),
        (status = 404, description = "Invalid KYC token"),
        (status = 409, description = "Token already used, or a subscription already exists for this email"),
        (status = 410, description = "Token expired"),
        (status = 413, description = "Uploaded document too large"),
        (status = 502, description = "Stored, but the partner API rejected or did not answer", body = KycSubmissionResponse),
    )
)]
#[instrument(skip_all)]
pub async fn submit_kyc(State(state): State<AppState>, request: KycRequest) -> Result<Response> {
    let now = Utc::now();
    let KycRequest { submission, documents } = request;

    let validated = validate_submission(&submission, now.date_naive(), state.config.kyc.minimum_owner_age)?;
    validate_documents(&documents, validated.owners.len())?;

    let subscription = persist_submission(&state.db, &validated, documents, now).await?;
    let external_id = subscription.external_id.clone();

    if !state.config.kyc.forward_on_submit {
        return Ok(submitted(StatusCode::CREATED, SUBMITTED_MESSAGE, external_id, subscription.partner_status));
    }

    match forward_subscription(&state.db, state.partner.as_ref(), &external_id).await {
        Ok(ForwardOutcome::Forwarded(subscription)) => {
            Ok(submitted(StatusCode::CREATED, SUBMITTED_MESSAGE, external_id, subscription.partner_status))
        }
        Ok(ForwardOutcome::Failed { subscription, .. }) => Ok(submitted(
            StatusCode::BAD_GATEWAY,
            FORWARD_FAILED_MESSAGE,
            external_id,
            subscription.partner_status,
        )),
        Err(e) => {
            // The submission is committed; an admin can forward it later
            warn!(external_id = %external_id, error = %e, "Could not forward new submission");
            Ok(submitted(StatusCode::CREATED, SUBMITTED_MESSAGE, external_id, PartnerStatus::Pending))
        }
    }
}

fn submitted(status: StatusCode, message: &str, external_id: String, partner_status: PartnerStatus) -> Response {
    (
        status,
        Json(KycSubmissionResponse {
            message: message.to_string(),
            external_id,
            partner_status,
        }),
    )
        .into_response()
}
