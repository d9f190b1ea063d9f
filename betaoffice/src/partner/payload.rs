//! Normalized subscription payload sent to the partner API.

use chrono::NaiveDate;
use serde::Serialize;

use crate::db::models::{company_members::CompanyMember, subscriptions::Subscription};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SubscriptionPayload {
    pub external_id: String,
    pub product_id: i32,
    pub customer: CustomerPayload,
    pub shipping_address: ShippingAddressPayload,
    pub subscription: SubscriptionDetails,
    pub company: CompanyPayload,
    pub members: Vec<MemberPayload>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CustomerPayload {
    pub first_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub middle_name: Option<String>,
    pub last_name: String,
    pub email_address: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ShippingAddressPayload {
    pub shipping_address_line_1: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shipping_address_line_2: Option<String>,
    pub shipping_address_city: String,
    pub shipping_address_postcode: String,
    /// ISO 3166-1 alpha-2
    pub shipping_address_country: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SubscriptionDetails {
    pub start_date: NaiveDate,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompanyPayload {
    pub name: String,
    pub trading_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limited_company_number: Option<String>,
    pub organisation_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub telephone_number: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MemberPayload {
    pub first_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub middle_name: Option<String>,
    pub last_name: String,
    pub email_address: String,
    pub date_of_birth: NaiveDate,
}

fn non_blank(value: &Option<String>) -> Option<String> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty()).map(str::to_string)
}

impl SubscriptionPayload {
    /// Build the partner payload from the stored records.
    ///
    /// The trading name falls back to the company name, and blank optional fields are omitted.
    pub fn from_records(subscription: &Subscription, members: &[CompanyMember]) -> Self {
        Self {
            external_id: subscription.external_id.clone(),
            product_id: subscription.product_id,
            customer: CustomerPayload {
                first_name: subscription.customer_first_name.clone(),
                middle_name: non_blank(&subscription.customer_middle_name),
                last_name: subscription.customer_last_name.clone(),
                email_address: subscription.customer_email.clone(),
            },
            shipping_address: ShippingAddressPayload {
                shipping_address_line_1: subscription.address_line_1.clone(),
                shipping_address_line_2: non_blank(&subscription.address_line_2),
                shipping_address_city: subscription.city.clone(),
                shipping_address_postcode: subscription.postcode.clone(),
                shipping_address_country: subscription.country.clone(),
            },
            subscription: SubscriptionDetails {
                start_date: subscription.start_date,
            },
            company: CompanyPayload {
                name: subscription.company_name.clone(),
                trading_name: non_blank(&subscription.trading_name).unwrap_or_else(|| subscription.company_name.clone()),
                limited_company_number: non_blank(&subscription.limited_company_number),
                organisation_type: subscription.organisation_type.clone(),
                telephone_number: non_blank(&subscription.telephone_number),
            },
            members: members
                .iter()
                .map(|member| MemberPayload {
                    first_name: member.first_name.clone(),
                    middle_name: non_blank(&member.middle_name),
                    last_name: member.last_name.clone(),
                    email_address: member.email.clone(),
                    date_of_birth: member.date_of_birth,
                })
                .collect(),
        }
    }
}
