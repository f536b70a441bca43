// ==========================================
// 非营利运营平台 - 发票导入 Profile
// ==========================================

use crate::domain::{CanonicalRow, DocumentHeader, ImportKind, InvoiceField, InvoiceHeader, LineItem};
use crate::importer::profiles::{line_amounts, CustomerRef, DocumentProfile, ImportProfile};
use rust_decimal::Decimal;

pub struct InvoiceProfile;

impl ImportProfile for InvoiceProfile {
    type Field = InvoiceField;

    const KIND: ImportKind = ImportKind::Invoices;

    fn aliases(field: InvoiceField) -> &'static [&'static str] {
        match field {
            InvoiceField::InvoiceNumber => &["Invoice Number", "Invoice #", "Invoice No", "Invoice ID", "invoice_number"],
            InvoiceField::InvoiceDate => &["Invoice Date", "Date", "invoice_date"],
            InvoiceField::DueDate => &["Due Date", "Payment Due", "due_date"],
            InvoiceField::CustomerName => &["Customer Name", "Customer", "Bill To", "Client", "customer_name"],
            InvoiceField::CustomerCode => &["Customer Code", "Customer ID", "Customer Number", "customer_code"],
            InvoiceField::CustomerEmail => &["Customer Email", "Email", "customer_email"],
            InvoiceField::Status => &["Status", "Invoice Status", "status"],
            InvoiceField::ItemName => &["Item Name", "Item", "Product", "Description", "item_name"],
            InvoiceField::Sku => &["SKU", "Item SKU", "Product Code", "sku"],
            InvoiceField::Quantity => &["Quantity", "Qty", "quantity"],
            InvoiceField::UnitPrice => &["Unit Price", "Rate", "Price", "unit_price"],
            InvoiceField::Amount => &["Amount", "Item Total", "Line Total", "amount"],
            InvoiceField::IsPaid => &["Paid", "Is Paid", "is_paid"],
            InvoiceField::Notes => &["Notes", "Terms", "Comments", "notes"],
        }
    }

    fn required() -> &'static [InvoiceField] {
        &[
            InvoiceField::InvoiceNumber,
            InvoiceField::CustomerName,
            InvoiceField::ItemName,
        ]
    }

    fn email_fields() -> &'static [InvoiceField] {
        &[InvoiceField::CustomerEmail]
    }
}

impl DocumentProfile for InvoiceProfile {
    fn document_number(row: &CanonicalRow<InvoiceField>) -> Option<String> {
        row.string(InvoiceField::InvoiceNumber)
    }

    fn customer(row: &CanonicalRow<InvoiceField>) -> Option<CustomerRef> {
        Some(CustomerRef {
            name: row.string(InvoiceField::CustomerName)?,
            code: row.string(InvoiceField::CustomerCode),
            email: row.string(InvoiceField::CustomerEmail),
        })
    }

    fn line(row: &CanonicalRow<InvoiceField>, line_number: usize) -> LineItem {
        let (quantity, unit_price, amount) = line_amounts(
            row.decimal(InvoiceField::Quantity),
            row.decimal(InvoiceField::UnitPrice),
            row.decimal(InvoiceField::Amount),
        );
        LineItem {
            line_number,
            item_name: row.string(InvoiceField::ItemName).unwrap_or_default(),
            sku: row.string(InvoiceField::Sku),
            quantity,
            unit_price,
            amount,
            source_row: row.row_number,
        }
    }

    fn header(
        first: &CanonicalRow<InvoiceField>,
        document_number: &str,
        customer_id: &str,
        total: Decimal,
    ) -> DocumentHeader {
        DocumentHeader::Invoice(InvoiceHeader {
            invoice_number: document_number.to_string(),
            customer_id: customer_id.to_string(),
            invoice_date: first.date(InvoiceField::InvoiceDate),
            due_date: first.date(InvoiceField::DueDate),
            status: first.string(InvoiceField::Status),
            is_paid: first.flag(InvoiceField::IsPaid).unwrap_or(false),
            notes: first.string(InvoiceField::Notes),
            total,
        })
    }
}
