//! HTTP adapters for the hosted backend (PostgREST-style API).
//!
//! Amounts go over the wire as decimal strings in major units. Values read
//! back may be numbers or strings; both are accepted.

use std::sync::Arc;

use anyhow::Context;
use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, Utc};
use reqwest::{RequestBuilder, Response, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use duka_cart::Product;
use duka_core::{Amount, OrderId, ProductId, UserId};
use duka_orders::{
    NewOrder, NewOrderLine, OrderRecord, OrderRecordLine, OrderStore, OrderStoreError,
};

use crate::catalog::{Catalog, CatalogError};
use crate::config::ClientConfig;

const ORDER_SELECT: &str =
    "id,user_id,status,amount,created_at,order_items(id,product_id,quantity,price,product:product_id(name))";

/// Authenticated HTTP client for the backend's REST endpoints. Cheap to clone.
#[derive(Debug, Clone)]
pub struct RestClient {
    http: reqwest::Client,
    base_url: Arc<str>,
    api_key: Arc<str>,
    bearer: Arc<str>,
}

impl RestClient {
    pub fn new(
        base_url: &str,
        api_key: &str,
        access_token: Option<&str>,
        timeout: std::time::Duration,
    ) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("failed to build HTTP client")?;
        Ok(Self {
            http,
            base_url: Arc::from(base_url.trim_end_matches('/')),
            api_key: Arc::from(api_key),
            bearer: Arc::from(access_token.unwrap_or(api_key)),
        })
    }

    pub fn from_config(config: &ClientConfig) -> anyhow::Result<Self> {
        let url = config
            .api_url
            .as_deref()
            .context("DUKA_API_URL is not set")?;
        let key = config
            .api_key
            .as_deref()
            .context("DUKA_API_KEY is not set")?;
        Self::new(url, key, config.access_token.as_deref(), config.http_timeout)
    }

    fn table_url(&self, table: &str) -> String {
        format!("{}/rest/v1/{table}", self.base_url)
    }

    fn authed(&self, req: RequestBuilder) -> RequestBuilder {
        req.header("apikey", self.api_key.as_ref())
            .bearer_auth(self.bearer.as_ref())
    }

    fn get(&self, table: &str) -> RequestBuilder {
        self.authed(self.http.get(self.table_url(table)))
    }

    fn post(&self, table: &str) -> RequestBuilder {
        self.authed(self.http.post(self.table_url(table)))
    }
}

async fn send(req: RequestBuilder) -> Result<Response, OrderStoreError> {
    let resp = req
        .send()
        .await
        .map_err(|err| OrderStoreError::Network(err.to_string()))?;

    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }

    let message = resp.text().await.unwrap_or_default();
    Err(match status {
        StatusCode::SERVICE_UNAVAILABLE | StatusCode::BAD_GATEWAY | StatusCode::GATEWAY_TIMEOUT => {
            OrderStoreError::Unavailable(format!("{status}: {message}"))
        }
        _ => OrderStoreError::rejected(status.as_u16(), message),
    })
}

async fn decode<T: serde::de::DeserializeOwned>(resp: Response) -> Result<T, OrderStoreError> {
    resp.json::<T>()
        .await
        .map_err(|err| OrderStoreError::Decode(err.to_string()))
}

/// Backend amount (number or decimal string, major units) as an [`Amount`].
pub fn amount_from_json(value: &Value) -> Result<Amount, OrderStoreError> {
    match value {
        Value::Number(n) => match n.as_u64() {
            Some(whole) => whole
                .checked_mul(100)
                .map(Amount::new)
                .ok_or_else(|| OrderStoreError::Decode(format!("amount {n} is too large"))),
            None => n
                .as_f64()
                .ok_or_else(|| OrderStoreError::Decode(format!("amount {n} is not representable")))
                .and_then(|f| {
                    Amount::from_major_f64(f).map_err(|e| OrderStoreError::Decode(e.to_string()))
                }),
        },
        Value::String(s) => {
            Amount::parse_major(s).map_err(|e| OrderStoreError::Decode(e.to_string()))
        }
        other => Err(OrderStoreError::Decode(format!("expected an amount, got {other}"))),
    }
}

/// Backend identifier (integer or string) as its canonical string.
pub fn id_from_json(value: &Value) -> Result<String, OrderStoreError> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Ok(s.trim().to_string()),
        Value::Number(n) => Ok(n.to_string()),
        other => Err(OrderStoreError::Decode(format!("expected an identifier, got {other}"))),
    }
}

fn timestamp_from_json(raw: &str) -> Result<DateTime<Utc>, OrderStoreError> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Ok(dt.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
        .map(|naive| naive.and_utc())
        .map_err(|err| OrderStoreError::Decode(format!("bad timestamp '{raw}': {err}")))
}

fn decode_err(err: duka_core::DomainError) -> OrderStoreError {
    OrderStoreError::Decode(err.to_string())
}

#[derive(Debug, Serialize)]
struct OrderPayload<'a> {
    user_id: Option<&'a str>,
    status: &'a str,
    amount: String,
    created_at: String,
}

impl<'a> From<&'a NewOrder> for OrderPayload<'a> {
    fn from(order: &'a NewOrder) -> Self {
        Self {
            user_id: order.user_id.as_ref().map(UserId::as_str),
            status: order.status.as_str(),
            amount: order.amount.to_major_string(),
            created_at: order.created_at.to_rfc3339(),
        }
    }
}

#[derive(Debug, Serialize)]
struct LinePayload<'a> {
    order_id: &'a str,
    product_id: &'a str,
    quantity: u32,
    price: String,
}

impl<'a> From<&'a NewOrderLine> for LinePayload<'a> {
    fn from(line: &'a NewOrderLine) -> Self {
        Self {
            order_id: line.order_id.as_str(),
            product_id: line.product_id.as_str(),
            quantity: line.quantity,
            price: line.price.to_major_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct InsertedRow {
    id: Value,
}

#[derive(Debug, Deserialize)]
struct OrderRow {
    id: Value,
    #[serde(default)]
    user_id: Option<String>,
    status: String,
    amount: Value,
    created_at: String,
    #[serde(default)]
    order_items: Vec<OrderItemRow>,
}

#[derive(Debug, Deserialize)]
struct OrderItemRow {
    id: Value,
    product_id: Value,
    quantity: u32,
    price: Value,
    #[serde(default)]
    product: Option<ProductName>,
}

#[derive(Debug, Deserialize)]
struct ProductName {
    name: String,
}

impl OrderRow {
    fn into_record(self) -> Result<OrderRecord, OrderStoreError> {
        let lines = self
            .order_items
            .into_iter()
            .map(|item| {
                Ok(OrderRecordLine {
                    id: id_from_json(&item.id)?,
                    product_id: ProductId::parse(id_from_json(&item.product_id)?)
                        .map_err(decode_err)?,
                    product_name: item.product.map(|p| p.name),
                    quantity: item.quantity,
                    price: amount_from_json(&item.price)?,
                })
            })
            .collect::<Result<Vec<_>, OrderStoreError>>()?;

        Ok(OrderRecord {
            id: OrderId::parse(id_from_json(&self.id)?).map_err(decode_err)?,
            user_id: self
                .user_id
                .map(|u| UserId::parse(u).map_err(decode_err))
                .transpose()?,
            status: self.status.into(),
            amount: amount_from_json(&self.amount)?,
            created_at: timestamp_from_json(&self.created_at)?,
            lines,
        })
    }
}

#[derive(Debug, Deserialize)]
struct ProductRow {
    id: Value,
    name: String,
    price: Value,
    #[serde(default)]
    image_url: Option<String>,
}

impl ProductRow {
    fn into_product(self) -> Result<Product, OrderStoreError> {
        let id = ProductId::parse(id_from_json(&self.id)?).map_err(decode_err)?;
        let product = Product::new(id, self.name, amount_from_json(&self.price)?);
        Ok(match self.image_url {
            Some(url) => product.with_image(url),
            None => product,
        })
    }
}

/// [`OrderStore`] over the `orders` and `order_items` tables.
#[derive(Debug, Clone)]
pub struct RestOrderStore {
    client: RestClient,
}

impl RestOrderStore {
    pub fn new(client: RestClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl OrderStore for RestOrderStore {
    async fn insert_order(&self, order: &NewOrder) -> Result<OrderId, OrderStoreError> {
        let req = self
            .client
            .post("orders")
            .header("Prefer", "return=representation")
            .json(&[OrderPayload::from(order)]);
        let rows: Vec<InsertedRow> = decode(send(req).await?).await?;
        let row = rows
            .into_iter()
            .next()
            .ok_or_else(|| OrderStoreError::Decode("insert returned no rows".to_string()))?;
        OrderId::parse(id_from_json(&row.id)?).map_err(decode_err)
    }

    async fn insert_order_lines(&self, lines: &[NewOrderLine]) -> Result<(), OrderStoreError> {
        let payload: Vec<LinePayload<'_>> = lines.iter().map(LinePayload::from).collect();
        let req = self
            .client
            .post("order_items")
            .header("Prefer", "return=minimal")
            .json(&payload);
        send(req).await?;
        Ok(())
    }

    async fn list_orders(&self, user_id: &UserId) -> Result<Vec<OrderRecord>, OrderStoreError> {
        let req = self.client.get("orders").query(&[
            ("select", ORDER_SELECT.to_string()),
            ("user_id", format!("eq.{user_id}")),
            ("order", "created_at.desc".to_string()),
        ]);
        let rows: Vec<OrderRow> = decode(send(req).await?).await?;
        rows.into_iter().map(OrderRow::into_record).collect()
    }
}

/// [`Catalog`] over the `products` table.
#[derive(Debug, Clone)]
pub struct RestCatalog {
    client: RestClient,
}

impl RestCatalog {
    pub fn new(client: RestClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Catalog for RestCatalog {
    async fn get_product(&self, id: &ProductId) -> Result<Product, CatalogError> {
        let req = self.client.get("products").query(&[
            ("select", "id,name,price,image_url".to_string()),
            ("id", format!("eq.{id}")),
        ]);
        let unavailable = |err: OrderStoreError| CatalogError::Unavailable(err.to_string());

        let rows: Vec<ProductRow> = decode(send(req).await.map_err(unavailable)?)
            .await
            .map_err(unavailable)?;
        match rows.into_iter().next() {
            Some(row) => row.into_product().map_err(unavailable),
            None => Err(CatalogError::NotFound(id.clone())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use duka_orders::OrderStatus;
    use serde_json::json;

    #[test]
    fn amounts_accept_numbers_and_decimal_strings() {
        assert_eq!(amount_from_json(&json!(250)).unwrap(), Amount::new(25000));
        assert_eq!(amount_from_json(&json!(99.5)).unwrap(), Amount::new(9950));
        assert_eq!(amount_from_json(&json!("99.50")).unwrap(), Amount::new(9950));
        assert!(amount_from_json(&json!(-1.0)).is_err());
        assert!(amount_from_json(&json!(null)).is_err());
        assert!(amount_from_json(&json!("ten")).is_err());
        assert!(matches!(
            amount_from_json(&json!(u64::MAX)),
            Err(OrderStoreError::Decode(_))
        ));
    }

    #[test]
    fn ids_accept_integers_and_strings() {
        assert_eq!(id_from_json(&json!(42)).unwrap(), "42");
        assert_eq!(id_from_json(&json!(" abc ")).unwrap(), "abc");
        assert!(id_from_json(&json!("")).is_err());
        assert!(id_from_json(&json!(true)).is_err());
    }

    #[test]
    fn order_payload_uses_major_unit_strings() {
        let order = NewOrder {
            user_id: Some(UserId::parse("u1").unwrap()),
            status: OrderStatus::Pending,
            amount: Amount::new(25000),
            created_at: Utc.with_ymd_and_hms(2024, 5, 1, 10, 0, 0).unwrap(),
        };
        let value = serde_json::to_value(OrderPayload::from(&order)).unwrap();
        assert_eq!(
            value,
            json!({
                "user_id": "u1",
                "status": "pending",
                "amount": "250.00",
                "created_at": "2024-05-01T10:00:00+00:00",
            })
        );
    }

    #[test]
    fn order_rows_decode_with_nested_items() {
        let rows: Vec<OrderRow> = serde_json::from_value(json!([{
            "id": 7,
            "user_id": "u1",
            "status": "paid",
            "amount": 250,
            "created_at": "2024-05-01T10:00:00.123456",
            "order_items": [
                { "id": 1, "product_id": 3, "quantity": 2, "price": "100.00",
                  "product": { "name": "Tea" } },
                { "id": 2, "product_id": 4, "quantity": 1, "price": 50, "product": null }
            ]
        }]))
        .unwrap();

        let record = rows.into_iter().next().unwrap().into_record().unwrap();
        assert_eq!(record.id.as_str(), "7");
        assert_eq!(record.status, OrderStatus::Paid);
        assert_eq!(record.amount, Amount::new(25000));
        assert_eq!(record.lines.len(), 2);
        assert_eq!(record.lines[0].product_id.as_str(), "3");
        assert_eq!(record.lines[0].price, Amount::new(10000));
        assert_eq!(record.lines[0].label(), "Tea");
        assert_eq!(record.lines[1].product_name, None);
        assert_eq!(record.lines[1].label(), "4");
        assert!(!record.is_orphaned());
    }

    #[test]
    fn product_rows_decode_optional_image() {
        let row: ProductRow =
            serde_json::from_value(json!({ "id": "p1", "name": "Tea", "price": 1.5 })).unwrap();
        let product = row.into_product().unwrap();
        assert_eq!(product.price, Amount::new(150));
        assert_eq!(product.image_url, "");
    }

    #[test]
    fn client_requires_url_and_key() {
        let cfg = ClientConfig::from_lookup(|k| match k {
            "DUKA_DATA_DIR" => Some("/tmp/duka".to_string()),
            _ => None,
        })
        .unwrap();
        assert!(RestClient::from_config(&cfg).is_err());
    }
}
