//! Validation of KYC submissions into typed records.

use chrono::NaiveDate;
use lettre::Address;

use crate::{
    api::models::kyc::{KycSubmissionRequest, OwnerRequest, UploadedDocument},
    errors::{Error, Result},
    kyc::country::normalize_country,
    types::TokenId,
};

/// A submission whose fields have all been checked and normalised.
#[derive(Debug, Clone)]
pub struct ValidatedSubmission {
    pub token: TokenId,
    pub product_id: Option<i32>,
    pub customer_email: String,
    pub customer_first_name: String,
    pub customer_middle_name: Option<String>,
    pub customer_last_name: String,
    pub company_name: String,
    pub trading_name: Option<String>,
    pub organisation_type: String,
    pub limited_company_number: Option<String>,
    pub telephone_number: Option<String>,
    pub address_line_1: String,
    pub address_line_2: Option<String>,
    pub city: String,
    pub postcode: String,
    /// ISO 3166-1 alpha-2
    pub country: String,
    pub owners: Vec<ValidatedOwner>,
}

#[derive(Debug, Clone)]
pub struct ValidatedOwner {
    pub email: String,
    pub first_name: String,
    pub middle_name: Option<String>,
    pub last_name: String,
    pub phone_number: Option<String>,
    pub date_of_birth: NaiveDate,
}

/// Trimmed value, `None` when absent or blank.
fn present(value: &Option<String>) -> Option<String> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty()).map(str::to_string)
}

fn is_valid_email(email: &str) -> bool {
    email.parse::<Address>().is_ok()
}

fn bad_request(message: impl Into<String>) -> Error {
    Error::BadRequest { message: message.into() }
}

/// Check a submission and normalise it.
///
/// `today` is the date owner ages are computed against. Field-level problems are reported as
/// [`Error::BadRequest`]; a malformed token is reported as [`Error::NotFound`], the same as a
/// token that does not exist.
pub fn validate_submission(request: &KycSubmissionRequest, today: NaiveDate, minimum_owner_age: u32) -> Result<ValidatedSubmission> {
    let token = present(&request.token);
    let customer_email = present(&request.customer_email);
    let customer_first_name = present(&request.customer_first_name);
    let customer_last_name = present(&request.customer_last_name);
    let company_name = present(&request.company_name);
    let organisation_type = present(&request.organisation_type);
    let address_line_1 = present(&request.address_line_1);
    let city = present(&request.city);
    let postcode = present(&request.postcode);
    let country = present(&request.country);

    let missing: Vec<&str> = [
        ("token", token.is_none()),
        ("customer_email", customer_email.is_none()),
        ("customer_first_name", customer_first_name.is_none()),
        ("customer_last_name", customer_last_name.is_none()),
        ("company_name", company_name.is_none()),
        ("organisation_type", organisation_type.is_none()),
        ("address_line_1", address_line_1.is_none()),
        ("city", city.is_none()),
        ("postcode", postcode.is_none()),
        ("country", country.is_none()),
    ]
    .into_iter()
    .filter_map(|(name, is_missing)| is_missing.then_some(name))
    .collect();

    let (
        Some(token),
        Some(customer_email),
        Some(customer_first_name),
        Some(customer_last_name),
        Some(company_name),
        Some(organisation_type),
        Some(address_line_1),
        Some(city),
        Some(postcode),
        Some(country),
    ) = (
        token,
        customer_email,
        customer_first_name,
        customer_last_name,
        company_name,
        organisation_type,
        address_line_1,
        city,
        postcode,
        country,
    )
    else {
        return Err(bad_request(format!("Missing required fields: {}", missing.join(", "))));
    };

    if !is_valid_email(&customer_email) {
        return Err(bad_request("Invalid customer email address"));
    }

    let country = normalize_country(&country).ok_or_else(|| bad_request(format!("Unrecognised country: {country}")))?;

    if request.members.is_empty() {
        return Err(bad_request("At least one company owner is required"));
    }

    let owners = request
        .members
        .iter()
        .enumerate()
        .map(|(idx, owner)| validate_owner(owner, idx + 1, today, minimum_owner_age))
        .collect::<Result<Vec<_>>>()?;

    let token: TokenId = token.parse().map_err(|_| Error::NotFound {
        message: "Invalid KYC token".to_string(),
    })?;

    Ok(ValidatedSubmission {
        token,
        product_id: request.product_id,
        customer_email,
        customer_first_name,
        customer_middle_name: present(&request.customer_middle_name),
        customer_last_name,
        company_name,
        trading_name: present(&request.trading_name),
        organisation_type: organisation_type.to_uppercase(),
        limited_company_number: present(&request.limited_company_number),
        telephone_number: present(&request.phone_number),
        address_line_1,
        address_line_2: present(&request.address_line_2),
        city,
        postcode: postcode.to_uppercase(),
        country,
        owners,
    })
}

/// Validate one owner. `number` is one-based, as shown to the customer.
fn validate_owner(owner: &OwnerRequest, number: usize, today: NaiveDate, minimum_owner_age: u32) -> Result<ValidatedOwner> {
    let (Some(email), Some(first_name), Some(last_name), Some(date_of_birth)) = (
        present(&owner.email),
        present(&owner.first_name),
        present(&owner.last_name),
        present(&owner.date_of_birth),
    ) else {
        return Err(bad_request(format!("Missing required member fields for owner {number}")));
    };

    if !is_valid_email(&email) {
        return Err(bad_request(format!("Invalid email address for owner {number}")));
    }

    let date_of_birth = NaiveDate::parse_from_str(&date_of_birth, "%Y-%m-%d")
        .map_err(|_| bad_request(format!("Invalid date of birth for owner {number}, expected YYYY-MM-DD")))?;

    // years_since is None for dates in the future
    let age = today.years_since(date_of_birth).unwrap_or(0);
    if age < minimum_owner_age {
        return Err(bad_request(format!("Owner {number} must be at least {minimum_owner_age} years old")));
    }

    Ok(ValidatedOwner {
        email,
        first_name,
        middle_name: present(&owner.middle_name),
        last_name,
        phone_number: present(&owner.phone_number),
        date_of_birth,
    })
}

/// Check that every uploaded document belongs to an owner of the submission, at most one
/// document of each kind per owner.
pub fn validate_documents(documents: &[UploadedDocument], owner_count: usize) -> Result<()> {
    for (idx, document) in documents.iter().enumerate() {
        if document.owner_index >= owner_count {
            return Err(bad_request(format!(
                "Document for owner {} does not match any owner in the submission",
                document.owner_index + 1
            )));
        }

        if documents[..idx]
            .iter()
            .any(|other| other.owner_index == document.owner_index && other.kind == document.kind)
        {
            return Err(bad_request(format!(
                "Duplicate {} document for owner {}",
                document.kind.as_str(),
                document.owner_index + 1
            )));
        }

        if document.content.is_empty() {
            return Err(bad_request(format!("Empty document uploaded for owner {}", document.owner_index + 1)));
        }
    }

    Ok(())
}
