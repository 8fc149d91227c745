//! Printable documents: manifest (romaneio), waybill (remito) and the
//! plain-text order summary

use rust_decimal::Decimal;

use crate::models::{Manifest, Order, OrderDestination, Roll, WaybillFields};

fn esc(input: &str) -> String {
    input
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

fn opt(value: &Option<String>) -> String {
    value.as_deref().map(esc).unwrap_or_else(|| "-".to_string())
}

fn kg(value: Decimal) -> String {
    format!("{:.2}", value.round_dp(2))
}

fn total_weight(rolls: &[Roll]) -> Decimal {
    rolls.iter().map(|r| r.weight_kg).sum()
}

fn html_shell(title: &str, body: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html lang="pt-BR">
<head>
<meta charset="UTF-8"/>
<title>{}</title>
<style>
body {{ font-family: Arial, Helvetica, sans-serif; margin: 24px; color: #111; font-size: 12px; }}
h1 {{ font-size: 18px; margin: 0 0 12px 0; }}
table {{ width: 100%; border-collapse: collapse; margin-top: 12px; }}
th, td {{ border: 1px solid #444; padding: 4px 6px; text-align: left; }}
th {{ background: #eee; }}
.grid {{ display: grid; grid-template-columns: 1fr 1fr; gap: 4px 24px; }}
.total {{ font-weight: bold; }}
.sign {{ margin-top: 48px; display: flex; justify-content: space-between; }}
.sign div {{ border-top: 1px solid #111; width: 40%; text-align: center; padding-top: 4px; }}
@media print {{ body {{ margin: 0; }} }}
</style>
</head>
<body>{}</body>
</html>"#,
        esc(title),
        body
    )
}

fn roll_table(rolls: &[Roll]) -> String {
    let mut body = String::from(
        "<table><thead><tr><th>#</th><th>Bobina</th><th>Tipo de Papel</th><th>Gramatura</th>\
         <th>Formato</th><th>Nota Fiscal</th><th>Peso (kg)</th></tr></thead><tbody>",
    );
    for (i, roll) in rolls.iter().enumerate() {
        body.push_str(&format!(
            "<tr><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td></tr>",
            i + 1,
            esc(&roll.roll_number),
            esc(&roll.paper_type),
            roll.grammage,
            esc(&roll.format),
            opt(&roll.invoice_number),
            kg(roll.weight_kg)
        ));
    }
    body.push_str(&format!(
        "<tr class=\"total\"><td colspan=\"6\">Total: {} bobina(s)</td><td>{}</td></tr></tbody></table>",
        rolls.len(),
        kg(total_weight(rolls))
    ));
    body
}

/// Printable manifest listing the rolls loaded on one truck
pub fn manifest_html(manifest: &Manifest, rolls: &[Roll]) -> String {
    let mut body = format!("<h1>Romaneio de Carga - CRT {}</h1>", esc(&manifest.crt_number));
    body.push_str(&format!(
        "<div class=\"grid\">\
         <div><strong>Data:</strong> {}</div><div><strong>Hora:</strong> {}</div>\
         <div><strong>Motorista:</strong> {}</div><div><strong>Destino:</strong> {}</div>\
         <div><strong>Placa carreta:</strong> {}</div><div><strong>Placa cavalo:</strong> {}</div>\
         <div><strong>Nota Fiscal:</strong> {}</div><div><strong>Emitido por:</strong> {}</div>\
         </div>",
        manifest.manifest_date.format("%d/%m/%Y"),
        manifest.manifest_time.format("%H:%M"),
        esc(&manifest.driver_name),
        esc(&manifest.destination),
        esc(&manifest.trailer_plate),
        opt(&manifest.truck_plate),
        opt(&manifest.invoice_number),
        opt(&manifest.created_by),
    ));
    body.push_str(&roll_table(rolls));
    body.push_str("<div class=\"sign\"><div>Conferente</div><div>Motorista</div></div>");
    html_shell(&format!("Romaneio {}", manifest.crt_number), &body)
}

/// Printable waybill built from the manifest and its order
pub fn waybill_html(
    manifest: &Manifest,
    order: Option<&Order>,
    rolls: &[Roll],
    fields: &WaybillFields,
) -> String {
    let first = rolls.first();
    let sender = fields
        .sender
        .clone()
        .or_else(|| first.and_then(|r| r.exporter.clone()));
    let recipient = fields
        .recipient
        .clone()
        .or_else(|| first.and_then(|r| r.importer.clone()));

    let mut body = format!("<h1>Remito - CRT {}</h1>", esc(&manifest.crt_number));
    body.push_str(&format!(
        "<div class=\"grid\">\
         <div><strong>Remetente:</strong> {}</div><div><strong>Destinatário:</strong> {}</div>\
         <div><strong>Transportadora:</strong> {}</div><div><strong>Destino:</strong> {}</div>\
         <div><strong>Motorista:</strong> {}</div><div><strong>Placas:</strong> {} {}</div>\
         <div><strong>Data:</strong> {}</div><div><strong>Pedido de Compra:</strong> {}</div>\
         </div>",
        opt(&sender),
        opt(&recipient),
        opt(&fields.carrier),
        esc(&manifest.destination),
        esc(&manifest.driver_name),
        esc(&manifest.trailer_plate),
        manifest.truck_plate.as_deref().map(esc).unwrap_or_default(),
        manifest.manifest_date.format("%d/%m/%Y"),
        order.map(|o| opt(&o.purchase_order)).unwrap_or_else(|| "-".to_string()),
    ));
    if let Some(order) = order {
        body.push_str(&format!(
            "<p><strong>Produto:</strong> {} {} g/m² formato {}</p>",
            opt(&order.paper_type),
            order.grammage.map(|g| g.to_string()).unwrap_or_else(|| "-".to_string()),
            opt(&order.format)
        ));
    }
    body.push_str(&roll_table(rolls));
    if let Some(observations) = &fields.observations {
        body.push_str(&format!("<p><strong>Observações:</strong> {}</p>", esc(observations)));
    }
    body.push_str("<div class=\"sign\"><div>Expedição</div><div>Recebido por</div></div>");
    html_shell(&format!("Remito {}", manifest.crt_number), &body)
}

/// Plain-text order summary
pub fn order_summary_text(order: &Order, destinations: &[OrderDestination], rolls: &[Roll]) -> String {
    let dash = |v: &Option<String>| v.clone().unwrap_or_else(|| "-".to_string());
    let status = order
        .order_status
        .map(|s| s.label().to_string())
        .unwrap_or_else(|| "-".to_string());

    let mut out = String::new();
    out.push_str(&format!("PEDIDO - CRT {}\n", order.crt_number));
    out.push_str(&"=".repeat(40));
    out.push('\n');
    out.push_str(&format!("Status: {}\n", status));
    out.push_str(&format!(
        "Prioridade: {}\n",
        order.priority.map(|p| p.as_str()).unwrap_or("-")
    ));
    out.push_str(&format!("Tipo de papel: {}\n", dash(&order.paper_type)));
    out.push_str(&format!(
        "Gramatura: {}\n",
        order.grammage.map(|g| g.to_string()).unwrap_or_else(|| "-".to_string())
    ));
    out.push_str(&format!("Formato: {}\n", dash(&order.format)));
    out.push_str(&format!("Pedido de compra: {}\n", dash(&order.purchase_order)));
    out.push_str(&format!("Nota fiscal: {}\n", dash(&order.invoice_number)));
    out.push_str(&format!(
        "DIP processada: {}\n",
        if order.dip_processed { "sim" } else { "não" }
    ));
    out.push_str("\nDestinos:\n");
    for destination in destinations {
        out.push_str(&format!("  Caminhão {}: {}\n", destination.position, destination.destination));
    }
    out.push_str(&format!(
        "\nBobinas: {}  Peso total: {} kg\n",
        rolls.len(),
        kg(total_weight(rolls))
    ));
    for roll in rolls {
        out.push_str(&format!(
            "  {}  {}  {} kg  {}\n",
            roll.roll_number,
            roll.paper_type,
            kg(roll.weight_kg),
            roll.status.as_str()
        ));
    }
    out
}
