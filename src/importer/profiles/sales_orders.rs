// ==========================================
// 非营利运营平台 - 销售订单导入 Profile
// ==========================================
// 源格式: 每行一个明细，单头字段在同单号各行重复
// 引用: 客户（按名称）
// ==========================================

use crate::domain::{
    CanonicalRow, DocumentHeader, ImportKind, LineItem, SalesOrderField, SalesOrderHeader,
};
use crate::importer::profiles::{line_amounts, CustomerRef, DocumentProfile, ImportProfile};
use rust_decimal::Decimal;

pub struct SalesOrderProfile;

impl ImportProfile for SalesOrderProfile {
    type Field = SalesOrderField;

    const KIND: ImportKind = ImportKind::SalesOrders;

    fn aliases(field: SalesOrderField) -> &'static [&'static str] {
        match field {
            SalesOrderField::OrderNumber => &["Order Number", "Order #", "Order No", "SalesOrder Number", "Order ID", "order_number"],
            SalesOrderField::OrderDate => &["Order Date", "Date", "order_date"],
            SalesOrderField::ShipmentDate => &["Shipment Date", "Ship Date", "Expected Shipment Date", "shipment_date"],
            SalesOrderField::CustomerName => &["Customer Name", "Customer", "Client", "customer_name"],
            SalesOrderField::CustomerCode => &["Customer Code", "Customer ID", "Customer Number", "customer_code"],
            SalesOrderField::CustomerEmail => &["Customer Email", "Email", "customer_email"],
            SalesOrderField::Status => &["Status", "Order Status", "status"],
            SalesOrderField::ItemName => &["Item Name", "Item", "Product", "Product Name", "Description", "item_name"],
            SalesOrderField::Sku => &["SKU", "Item SKU", "Product Code", "sku"],
            SalesOrderField::Quantity => &["Quantity", "Qty", "Quantity Ordered", "quantity"],
            SalesOrderField::UnitPrice => &["Unit Price", "Rate", "Price", "Item Price", "unit_price"],
            SalesOrderField::Amount => &["Amount", "Item Total", "Line Total", "amount"],
            SalesOrderField::Notes => &["Notes", "Customer Notes", "Comments", "notes"],
        }
    }

    fn required() -> &'static [SalesOrderField] {
        &[
            SalesOrderField::OrderNumber,
            SalesOrderField::CustomerName,
            SalesOrderField::ItemName,
        ]
    }

    fn email_fields() -> &'static [SalesOrderField] {
        &[SalesOrderField::CustomerEmail]
    }
}

impl DocumentProfile for SalesOrderProfile {
    fn document_number(row: &CanonicalRow<SalesOrderField>) -> Option<String> {
        row.string(SalesOrderField::OrderNumber)
    }

    fn customer(row: &CanonicalRow<SalesOrderField>) -> Option<CustomerRef> {
        Some(CustomerRef {
            name: row.string(SalesOrderField::CustomerName)?,
            code: row.string(SalesOrderField::CustomerCode),
            email: row.string(SalesOrderField::CustomerEmail),
        })
    }

    fn line(row: &CanonicalRow<SalesOrderField>, line_number: usize) -> LineItem {
        let (quantity, unit_price, amount) = line_amounts(
            row.decimal(SalesOrderField::Quantity),
            row.decimal(SalesOrderField::UnitPrice),
            row.decimal(SalesOrderField::Amount),
        );
        LineItem {
            line_number,
            item_name: row.string(SalesOrderField::ItemName).unwrap_or_default(),
            sku: row.string(SalesOrderField::Sku),
            quantity,
            unit_price,
            amount,
            source_row: row.row_number,
        }
    }

    fn header(
        first: &CanonicalRow<SalesOrderField>,
        document_number: &str,
        customer_id: &str,
        total: Decimal,
    ) -> DocumentHeader {
        DocumentHeader::SalesOrder(SalesOrderHeader {
            order_number: document_number.to_string(),
            customer_id: customer_id.to_string(),
            order_date: first.date(SalesOrderField::OrderDate),
            shipment_date: first.date(SalesOrderField::ShipmentDate),
            status: first.string(SalesOrderField::Status),
            notes: first.string(SalesOrderField::Notes),
            total,
        })
    }
}
