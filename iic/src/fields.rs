//! Extraction of the invoice fields that make up an IIC.

use std::fmt::Display;

use log::debug;

use crate::generator::PlainText;

/// An error that may occur when extracting [`InvoiceFields`] from a document.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The element required for a field is missing from the document.
    #[error("Unable to find element {element} holding attribute {attribute}")]
    FieldNotFound {
        /// The name of the missing element.
        element: &'static str,

        /// The name of the attribute that should have been read from the element.
        attribute: &'static str,
    },

    /// The element required for a field exists, but lacks the attribute.
    #[error("Unable to find attribute {attribute} on element {element}")]
    AttributeNotFound {
        /// The name of the element that lacks the attribute.
        element: &'static str,

        /// The name of the missing attribute.
        attribute: &'static str,
    },
}

/// Read access to the attributes of a single element.
pub trait AttributeSource {
    /// Returns the value of the attribute `name`, if it is set.
    fn attribute(&self, name: &str) -> Option<&str>;
}

/// Lookup of elements in a structured document.
pub trait ElementSource {
    /// The element type returned by [`ElementSource::find_element`].
    type Element: AttributeSource;

    /// Returns the first element named `name` in document order, if any.
    fn find_element(&self, name: &str) -> Option<&Self::Element>;
}

/// The location of a single IIC field in an invoice document.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct FieldLocator {
    /// The name of the element holding the field.
    pub element: &'static str,

    /// The name of the attribute holding the field.
    pub attribute: &'static str,
}

impl FieldLocator {
    /// Reads the value described by `self` from `source`.
    ///
    /// # Errors
    ///
    /// Returns an error if
    /// - the element is missing in `source` ([`Error::FieldNotFound`]),
    /// - or the element does not carry the attribute ([`Error::AttributeNotFound`]).
    pub fn read<S: ElementSource + ?Sized>(&self, source: &S) -> Result<String, Error> {
        let element = source
            .find_element(self.element)
            .ok_or(Error::FieldNotFound {
                element: self.element,
                attribute: self.attribute,
            })?;
        let value = element
            .attribute(self.attribute)
            .ok_or(Error::AttributeNotFound {
                element: self.element,
                attribute: self.attribute,
            })?;
        Ok(value.to_string())
    }
}

impl Display for FieldLocator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}", self.element, self.attribute)
    }
}

/// The name of the element holding the seller's tax identification number.
pub const SELLER_ELEMENT: &str = "Seller";

/// The name of the element holding all other IIC fields.
pub const INVOICE_ELEMENT: &str = "Invoice";

/// The locators of all IIC fields, in the order in which they are concatenated.
pub const FIELD_LOCATORS: [FieldLocator; 7] = [
    FieldLocator {
        element: SELLER_ELEMENT,
        attribute: "IDNum",
    },
    FieldLocator {
        element: INVOICE_ELEMENT,
        attribute: "IssueDateTime",
    },
    FieldLocator {
        element: INVOICE_ELEMENT,
        attribute: "InvOrdNum",
    },
    FieldLocator {
        element: INVOICE_ELEMENT,
        attribute: "BusinUnitCode",
    },
    FieldLocator {
        element: INVOICE_ELEMENT,
        attribute: "TCRCode",
    },
    FieldLocator {
        element: INVOICE_ELEMENT,
        attribute: "SoftCode",
    },
    FieldLocator {
        element: INVOICE_ELEMENT,
        attribute: "TotPrice",
    },
];

/// The invoice fields that are the input of an IIC.
///
/// Values are kept exactly as found in the invoice: no trimming, case folding or other
/// normalization is applied.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct InvoiceFields {
    tin: String,
    issue_date_time: String,
    inv_ord_num: String,
    busin_unit_code: String,
    tcr_code: String,
    soft_code: String,
    tot_price: String,
}

impl InvoiceFields {
    /// Creates new [`InvoiceFields`] from the individual values.
    ///
    /// # Examples
    ///
    /// ```
    /// use iic::InvoiceFields;
    ///
    /// let fields = InvoiceFields::new(
    ///     "123456789",
    ///     "2023-01-01T10:00:00",
    ///     "1",
    ///     "BU1",
    ///     "TCR1",
    ///     "SC1",
    ///     "100.00",
    /// );
    /// assert_eq!(fields.tin(), "123456789");
    /// ```
    pub fn new(
        tin: impl Into<String>,
        issue_date_time: impl Into<String>,
        inv_ord_num: impl Into<String>,
        busin_unit_code: impl Into<String>,
        tcr_code: impl Into<String>,
        soft_code: impl Into<String>,
        tot_price: impl Into<String>,
    ) -> Self {
        Self {
            tin: tin.into(),
            issue_date_time: issue_date_time.into(),
            inv_ord_num: inv_ord_num.into(),
            busin_unit_code: busin_unit_code.into(),
            tcr_code: tcr_code.into(),
            soft_code: soft_code.into(),
            tot_price: tot_price.into(),
        }
    }

    /// Extracts [`InvoiceFields`] from a document.
    ///
    /// The fields are read in the order of [`FIELD_LOCATORS`] and extraction stops at the
    /// first field that can not be read. If several elements share a name, the first one in
    /// document order is used.
    ///
    /// # Errors
    ///
    /// Returns an error if
    /// - a required element is missing ([`Error::FieldNotFound`]),
    /// - or a required attribute is missing ([`Error::AttributeNotFound`]).
    pub fn extract<S: ElementSource + ?Sized>(source: &S) -> Result<Self, Error> {
        let [
            tin,
            issue_date_time,
            inv_ord_num,
            busin_unit_code,
            tcr_code,
            soft_code,
            tot_price,
        ] = &FIELD_LOCATORS;

        let fields = Self {
            tin: tin.read(source)?,
            issue_date_time: issue_date_time.read(source)?,
            inv_ord_num: inv_ord_num.read(source)?,
            busin_unit_code: busin_unit_code.read(source)?,
            tcr_code: tcr_code.read(source)?,
            soft_code: soft_code.read(source)?,
            tot_price: tot_price.read(source)?,
        };
        debug!("Extracted IIC fields for invoice {}", fields.inv_ord_num);

        Ok(fields)
    }

    /// Returns the tax identification number of the seller.
    pub fn tin(&self) -> &str {
        &self.tin
    }

    /// Returns the date and time of issue.
    pub fn issue_date_time(&self) -> &str {
        &self.issue_date_time
    }

    /// Returns the ordinal number of the invoice.
    pub fn inv_ord_num(&self) -> &str {
        &self.inv_ord_num
    }

    /// Returns the business unit code.
    pub fn busin_unit_code(&self) -> &str {
        &self.busin_unit_code
    }

    /// Returns the code of the electronic cash register (TCR).
    pub fn tcr_code(&self) -> &str {
        &self.tcr_code
    }

    /// Returns the code of the invoicing software.
    pub fn soft_code(&self) -> &str {
        &self.soft_code
    }

    /// Returns the total price of the invoice.
    pub fn tot_price(&self) -> &str {
        &self.tot_price
    }

    /// Returns the field values in concatenation order.
    pub fn values(&self) -> [&str; 7] {
        [
            &self.tin,
            &self.issue_date_time,
            &self.inv_ord_num,
            &self.busin_unit_code,
            &self.tcr_code,
            &self.soft_code,
            &self.tot_price,
        ]
    }

    /// Returns the canonical [`PlainText`] of the fields.
    ///
    /// The values are joined with a single `|` in the order of [`FIELD_LOCATORS`], without a
    /// leading or trailing delimiter.
    ///
    /// # Note
    ///
    /// A `|` inside a value is not escaped, so different field splits may produce the same
    /// plaintext. The format is mandated by the tax authority and must not be changed.
    ///
    /// # Examples
    ///
    /// ```
    /// use iic::InvoiceFields;
    ///
    /// let fields = InvoiceFields::new("A", "B", "C", "D", "E", "F", "G");
    /// assert_eq!(fields.plain_text().as_str(), "A|B|C|D|E|F|G");
    /// ```
    pub fn plain_text(&self) -> PlainText {
        PlainText::new(self.values().join("|"))
    }
}
