//! Local copy of a listing while it is being created or edited.

use std::fmt;
use std::str::FromStr;

use validator::{Validate, ValidationErrors};

use super::error::{EditorError, EditorResult};
use crate::models::{ImageFile, ListingFields, ListingType, MAX_LISTING_IMAGES};

/// Editable input, addressed by its document field name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DraftField {
    Type,
    Name,
    Bedrooms,
    Bathrooms,
    Parking,
    Furnished,
    Address,
    Latitude,
    Longitude,
    Offer,
    RegularPrice,
    DiscountedPrice,
    /// File picker; replaces the attached images.
    Images,
}

impl DraftField {
    pub const ALL: [Self; 13] = [
        Self::Type,
        Self::Name,
        Self::Bedrooms,
        Self::Bathrooms,
        Self::Parking,
        Self::Furnished,
        Self::Address,
        Self::Latitude,
        Self::Longitude,
        Self::Offer,
        Self::RegularPrice,
        Self::DiscountedPrice,
        Self::Images,
    ];

    #[must_use]
    pub const fn id(self) -> &'static str {
        match self {
            Self::Type => "type",
            Self::Name => "name",
            Self::Bedrooms => "bedrooms",
            Self::Bathrooms => "bathrooms",
            Self::Parking => "parking",
            Self::Furnished => "furnished",
            Self::Address => "address",
            Self::Latitude => "latitude",
            Self::Longitude => "longitude",
            Self::Offer => "offer",
            Self::RegularPrice => "regularPrice",
            Self::DiscountedPrice => "discountedPrice",
            Self::Images => "images",
        }
    }
}

impl fmt::Display for DraftField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

impl FromStr for DraftField {
    type Err = EditorError;

    fn from_str(s: &str) -> EditorResult<Self> {
        let id = s.trim();
        Self::ALL
            .into_iter()
            .find(|field| field.id() == id)
            .ok_or_else(|| EditorError::UnknownField(id.to_string()))
    }
}

/// One input event from the form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldInput {
    /// Text or button value for the field named `field`.
    Value { field: String, value: String },
    Files(Vec<ImageFile>),
}

impl FieldInput {
    pub fn value(field: impl Into<String>, value: impl Into<String>) -> Self {
        Self::Value {
            field: field.into(),
            value: value.into(),
        }
    }

    #[must_use]
    pub const fn files(files: Vec<ImageFile>) -> Self {
        Self::Files(files)
    }
}

/// Form state of a listing before it is written.
#[derive(Debug, Clone, PartialEq, Validate)]
pub struct ListingDraft {
    pub listing_type: ListingType,
    #[validate(length(min = 10, max = 32, message = "Name must be between 10 and 32 characters"))]
    pub name: String,
    #[validate(range(min = 1, max = 50, message = "Bedrooms must be between 1 and 50"))]
    pub bedrooms: u32,
    #[validate(range(min = 1, max = 50, message = "Bathrooms must be between 1 and 50"))]
    pub bathrooms: u32,
    pub parking: bool,
    pub furnished: bool,
    pub address: String,
    pub latitude: f64,
    pub longitude: f64,
    pub offer: bool,
    pub regular_price: f64,
    pub discounted_price: f64,
    /// URLs already stored on the document being edited.
    pub image_urls: Vec<String>,
    /// Files picked for upload on submit.
    pub images: Vec<ImageFile>,
    pub user_ref: String,
}

impl ListingDraft {
    /// Empty create form owned by `owner`.
    pub fn blank(owner: impl Into<String>) -> Self {
        Self {
            listing_type: ListingType::Rent,
            name: String::new(),
            bedrooms: 1,
            bathrooms: 1,
            parking: false,
            furnished: false,
            address: String::new(),
            latitude: 0.0,
            longitude: 0.0,
            offer: false,
            regular_price: 0.0,
            discounted_price: 0.0,
            image_urls: Vec::new(),
            images: Vec::new(),
            user_ref: owner.into(),
        }
    }

    /// Edit form populated from a stored document.
    #[must_use]
    pub fn from_fields(fields: ListingFields) -> Self {
        Self {
            listing_type: fields.listing_type,
            name: fields.name.trim().to_string(),
            bedrooms: fields.bedrooms,
            bathrooms: fields.bathrooms,
            parking: fields.parking,
            furnished: fields.furnished,
            address: fields.address.trim().to_string(),
            latitude: fields.latitude,
            longitude: fields.longitude,
            offer: fields.offer,
            regular_price: fields.regular_price,
            discounted_price: fields.discounted_price.unwrap_or_default(),
            image_urls: fields.image_urls,
            images: Vec::new(),
            user_ref: fields.user_ref,
        }
    }

    /// Apply one input event. A rejected input leaves the draft unchanged.
    pub fn apply(&mut self, input: FieldInput) -> EditorResult<()> {
        match input {
            FieldInput::Files(files) => {
                self.images = files;
                Ok(())
            }
            FieldInput::Value { field, value } => {
                let field = field.parse::<DraftField>()?;
                self.set(field, &value)
            }
        }
    }

    fn set(&mut self, field: DraftField, raw: &str) -> EditorResult<()> {
        match field {
            DraftField::Type => {
                self.listing_type = InputValue::from(raw)
                    .text()
                    .and_then(|text| text.parse::<ListingType>().ok())
                    .ok_or_else(|| invalid(field, raw))?;
            }
            DraftField::Name => self.name = raw.trim().to_string(),
            DraftField::Address => self.address = raw.trim().to_string(),
            DraftField::Parking => self.parking = flag(field, raw)?,
            DraftField::Furnished => self.furnished = flag(field, raw)?,
            DraftField::Offer => self.offer = flag(field, raw)?,
            DraftField::Bedrooms => self.bedrooms = count(field, raw)?,
            DraftField::Bathrooms => self.bathrooms = count(field, raw)?,
            DraftField::Latitude => self.latitude = number(field, raw)?,
            DraftField::Longitude => self.longitude = number(field, raw)?,
            DraftField::RegularPrice => self.regular_price = number(field, raw)?,
            DraftField::DiscountedPrice => self.discounted_price = number(field, raw)?,
            DraftField::Images => {
                return Err(EditorError::InvalidValue {
                    field: field.id(),
                    value: "images are attached as files".to_string(),
                });
            }
        }
        Ok(())
    }

    /// Checks run before anything leaves the client, in submit order.
    pub fn check(&self, creating: bool) -> EditorResult<()> {
        if self.discounted_price >= self.regular_price {
            return Err(EditorError::DiscountNotLower);
        }
        if self.images.len() > MAX_LISTING_IMAGES {
            return Err(EditorError::TooManyImages(self.images.len()));
        }
        self.validate()
            .map_err(|errors| EditorError::InvalidField(first_violation(&errors)))?;
        if creating && self.images.is_empty() {
            return Err(EditorError::MissingImages);
        }
        Ok(())
    }

    /// Document body to write. The discount only survives on offers.
    #[must_use]
    pub fn to_fields(&self, image_urls: Vec<String>) -> ListingFields {
        ListingFields {
            listing_type: self.listing_type,
            name: self.name.clone(),
            bedrooms: self.bedrooms,
            bathrooms: self.bathrooms,
            parking: self.parking,
            furnished: self.furnished,
            address: self.address.clone(),
            latitude: self.latitude,
            longitude: self.longitude,
            offer: self.offer,
            regular_price: self.regular_price,
            discounted_price: self.offer.then_some(self.discounted_price),
            image_urls,
            user_ref: self.user_ref.clone(),
        }
    }
}

/// Text input after `"true"`/`"false"` coercion.
#[derive(Debug, Clone, Copy)]
enum InputValue<'a> {
    Flag(bool),
    Text(&'a str),
}

impl<'a> From<&'a str> for InputValue<'a> {
    fn from(raw: &'a str) -> Self {
        match raw {
            "true" => Self::Flag(true),
            "false" => Self::Flag(false),
            other => Self::Text(other),
        }
    }
}

impl<'a> InputValue<'a> {
    const fn flag(self) -> Option<bool> {
        match self {
            Self::Flag(flag) => Some(flag),
            Self::Text(_) => None,
        }
    }

    const fn text(self) -> Option<&'a str> {
        match self {
            Self::Text(text) => Some(text),
            Self::Flag(_) => None,
        }
    }

    fn count(self) -> Option<u32> {
        self.text()?.trim().parse().ok()
    }

    fn number(self) -> Option<f64> {
        self.text()?
            .trim()
            .parse::<f64>()
            .ok()
            .filter(|number| number.is_finite())
    }
}

fn flag(field: DraftField, raw: &str) -> EditorResult<bool> {
    InputValue::from(raw).flag().ok_or_else(|| invalid(field, raw))
}

fn count(field: DraftField, raw: &str) -> EditorResult<u32> {
    InputValue::from(raw).count().ok_or_else(|| invalid(field, raw))
}

fn number(field: DraftField, raw: &str) -> EditorResult<f64> {
    InputValue::from(raw).number().ok_or_else(|| invalid(field, raw))
}

fn invalid(field: DraftField, raw: &str) -> EditorError {
    EditorError::InvalidValue {
        field: field.id(),
        value: raw.to_string(),
    }
}

fn first_violation(errors: &ValidationErrors) -> String {
    let mut fields: Vec<_> = errors.field_errors().into_iter().collect();
    fields.sort_by_key(|(field, _)| *field);
    fields
        .into_iter()
        .find_map(|(field, violations)| {
            violations.first().map(|violation| {
                violation
                    .message
                    .as_ref()
                    .map_or_else(|| format!("{field} is invalid"), ToString::to_string)
            })
        })
        .unwrap_or_else(|| "Listing is invalid".to_string())
}
