//! Prompts for vision-model extraction of bank-statement pages.
//!
//! Centralising both prompts here serves two purposes:
//!
//! 1. **Single source of truth** — the response schemas the assembler
//!    deserialises ([`crate::document::TransactionBlock`],
//!    [`crate::document::AccountEnvelope`]) are promised to the model in
//!    exactly one place.
//!
//! 2. **Testability** — unit tests can assert the prompts still name the
//!    required fields without spinning up a real model.

/// Prompt for extracting bank transactions from one statement page image.
///
/// The response must deserialise into [`crate::document::TransactionBlock`].
pub const TRANSACTIONS_PROMPT: &str = r#"You are an assistant digitising scans and faxes of bank statements.
The attached image is one page of a statement and may contain multiple bank transactions.

Return a single JSON object in exactly this shape:

{
    "transactions": [
        {
            "date": "Transaction date, always required.",
            "amount": "Transaction amount, always required.",
            "transaction_text": "Booking text, if legible."
        }
    ]
}

Rules:
1. List the transactions in the order they appear on the page, top to bottom.
2. Copy dates and amounts exactly as printed; do not reformat or convert them.
3. If a transaction's booking text is missing or illegible, omit "transaction_text".
4. IF NO TRANSACTIONS ARE VISIBLE ON THE PAGE, return: {"transactions": []}
5. Respond with the JSON object only. No prose, no markdown fences, no comments."#;

/// Prompt for extracting account-level data from the statement cover page.
///
/// The response must deserialise into [`crate::document::AccountEnvelope`];
/// an empty `account_data` mapping is a valid answer.
pub const ACCOUNT_INFO_PROMPT: &str = r#"You are an assistant digitising scans and faxes of bank statements.
The attached image is the cover page of a statement and may contain the customer's account data.

Return a single JSON object in exactly this shape:

{
    "account_data": {
        "name": "Customer name",
        "IBAN": "IBAN",
        "document_date": "Date the statement was issued",
        "previous_account_balance": "Balance carried over from the previous statement",
        "new_account_balance": "Closing balance of this statement"
    }
}

Rules:
1. Copy every value exactly as printed; do not reformat dates or amounts.
2. Omit any field that is not present on the page.
3. IF NO ACCOUNT DATA IS VISIBLE ON THE PAGE, return: {"account_data": {}}
4. Respond with the JSON object only. No prose, no markdown fences, no comments."#;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transactions_prompt_names_required_fields() {
        for field in ["date", "amount", "transaction_text", "transactions"] {
            assert!(
                TRANSACTIONS_PROMPT.contains(field),
                "missing field: {field}"
            );
        }
    }

    #[test]
    fn account_prompt_names_required_fields() {
        for field in [
            "account_data",
            "name",
            "IBAN",
            "document_date",
            "previous_account_balance",
            "new_account_balance",
        ] {
            assert!(ACCOUNT_INFO_PROMPT.contains(field), "missing field: {field}");
        }
    }

    #[test]
    fn prompts_describe_the_empty_response() {
        assert!(TRANSACTIONS_PROMPT.contains(r#"{"transactions": []}"#));
        assert!(ACCOUNT_INFO_PROMPT.contains(r#"{"account_data": {}}"#));
    }
}
