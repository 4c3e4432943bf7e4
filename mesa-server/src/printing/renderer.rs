//! Ticket renderer
//!
//! Turns printer layout settings plus ticket data into a line-structured
//! [`Ticket`], which encodes to ESC/POS bytes. Every function here is pure:
//! the print timestamp is an argument, so the same inputs always produce the
//! same bytes.

use chrono::DateTime;
use chrono_tz::Tz;
use mesa_printer::{EscPosBuilder, pad_width, text_width, wrap_text};
use rust_decimal::{Decimal, RoundingStrategy};
use shared::models::{
    CharPitch, ConnectionKind, ControlTicket, MAX_CHARS_PER_LINE, MAX_EMPHASIS,
    MIN_CHARS_PER_LINE, PaperWidth, PrintMode, Printer,
};
use thiserror::Error;

use super::types::KitchenTicket;

/// Layout settings that make a ticket unprintable
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FormatError {
    #[error("chars_per_line {0} is outside {min}..={max}", min = MIN_CHARS_PER_LINE, max = MAX_CHARS_PER_LINE)]
    CharsPerLineOutOfRange(u16),

    #[error("{chars_per_line} columns do not fit {paper} paper ({max} max at this pitch)")]
    ExceedsPaper {
        chars_per_line: u16,
        paper: &'static str,
        max: u16,
    },

    #[error("{field} {value} is outside 1..={max}", max = MAX_EMPHASIS)]
    EmphasisOutOfRange { field: &'static str, value: u8 },
}

/// Per-printer layout, derived from its configuration
#[derive(Debug, Clone, PartialEq)]
pub struct TicketLayout {
    pub paper_width: PaperWidth,
    pub char_pitch: CharPitch,
    pub chars_per_line: u16,
    pub header_size: u8,
    pub footer_size: u8,
    pub header_text: Option<String>,
    pub footer_text: Option<String>,
    pub control_font_size: u8,
    pub control_line_spacing: Option<u8>,
}

impl TicketLayout {
    pub fn from_printer(printer: &Printer) -> Self {
        Self {
            paper_width: printer.paper_width,
            char_pitch: printer.char_pitch,
            chars_per_line: printer.chars_per_line,
            header_size: printer.header_size,
            footer_size: printer.footer_size,
            header_text: printer.header_text.clone().filter(|t| !t.trim().is_empty()),
            footer_text: printer.footer_text.clone().filter(|t| !t.trim().is_empty()),
            control_font_size: printer.control_font_size,
            control_line_spacing: printer.control_line_spacing,
        }
    }

    pub fn validate(&self) -> Result<(), FormatError> {
        if !(MIN_CHARS_PER_LINE..=MAX_CHARS_PER_LINE).contains(&self.chars_per_line) {
            return Err(FormatError::CharsPerLineOutOfRange(self.chars_per_line));
        }

        let max = self.paper_width.max_columns(self.char_pitch);
        if self.chars_per_line > max {
            return Err(FormatError::ExceedsPaper {
                chars_per_line: self.chars_per_line,
                paper: self.paper_width.as_str(),
                max,
            });
        }

        for (field, value) in [
            ("header_size", self.header_size),
            ("footer_size", self.footer_size),
            ("control_font_size", self.control_font_size),
        ] {
            if !(1..=MAX_EMPHASIS).contains(&value) {
                return Err(FormatError::EmphasisOutOfRange { field, value });
            }
        }

        Ok(())
    }

    fn writer(&self, line_spacing: Option<u8>) -> Result<TicketWriter, FormatError> {
        self.validate()?;
        Ok(TicketWriter {
            ticket: Ticket {
                columns: self.chars_per_line,
                char_pitch: self.char_pitch,
                line_spacing,
                lines: Vec::new(),
            },
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Align {
    Left,
    Center,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TicketLine {
    Text {
        text: String,
        align: Align,
        bold: bool,
        /// Magnification on both axes; the line holds `columns / scale` characters
        scale: u8,
    },
    /// Full-width row of one character
    Rule(char),
    Feed(u8),
}

/// A rendered ticket, one entry per printed row
#[derive(Debug, Clone, PartialEq)]
pub struct Ticket {
    columns: u16,
    char_pitch: CharPitch,
    line_spacing: Option<u8>,
    lines: Vec<TicketLine>,
}

impl Ticket {
    pub fn columns(&self) -> u16 {
        self.columns
    }

    pub fn lines(&self) -> &[TicketLine] {
        &self.lines
    }

    /// Printed text without commands, rules expanded
    pub fn plain_text(&self) -> String {
        let mut out = String::new();
        for line in &self.lines {
            match line {
                TicketLine::Text { text, .. } => out.push_str(text),
                TicketLine::Rule(c) => out.push_str(&c.to_string().repeat(self.columns as usize)),
                TicketLine::Feed(_) => {}
            }
            out.push('\n');
        }
        out
    }

    /// Encode to ESC/POS (Windows-1252 text)
    pub fn to_escpos(&self) -> Vec<u8> {
        let width = self.columns as usize;
        let mut b = EscPosBuilder::new(width);

        if self.char_pitch == CharPitch::Condensed {
            b.font_b();
        }
        if let Some(dots) = self.line_spacing {
            b.line_spacing(dots);
        }

        for line in &self.lines {
            match line {
                TicketLine::Text {
                    text,
                    align,
                    bold,
                    scale,
                } => {
                    match align {
                        Align::Left => b.left(),
                        Align::Center => b.center(),
                    };
                    if *bold {
                        b.bold();
                    }
                    if *scale > 1 {
                        b.size(*scale);
                    }
                    b.line(text);
                    if *scale > 1 {
                        b.reset_size();
                    }
                    if *bold {
                        b.bold_off();
                    }
                }
                TicketLine::Rule('=') => {
                    b.left();
                    b.sep_double();
                }
                TicketLine::Rule('-') => {
                    b.left();
                    b.sep_single();
                }
                TicketLine::Rule(c) => {
                    b.left();
                    b.line(&c.to_string().repeat(width));
                }
                TicketLine::Feed(n) => {
                    b.feed(*n);
                }
            }
        }

        b.left();
        if self.line_spacing.is_some() {
            b.default_line_spacing();
        }
        b.cut_feed(4);
        b.build()
    }
}

#[derive(Debug, Clone, Copy)]
struct Style {
    align: Align,
    bold: bool,
    scale: u8,
}

impl Style {
    const LEFT: Style = Style {
        align: Align::Left,
        bold: false,
        scale: 1,
    };
    const CENTER: Style = Style {
        align: Align::Center,
        bold: false,
        scale: 1,
    };

    fn bold(self) -> Self {
        Self { bold: true, ..self }
    }

    fn scaled(self, scale: u8) -> Self {
        Self {
            scale: scale.max(1),
            ..self
        }
    }
}

/// Accumulates wrapped lines so nothing exceeds the effective width
struct TicketWriter {
    ticket: Ticket,
}

impl TicketWriter {
    fn width(&self, style: Style) -> usize {
        (self.ticket.columns as usize / style.scale as usize).max(1)
    }

    fn push(&mut self, text: String, style: Style) {
        self.ticket.lines.push(TicketLine::Text {
            text,
            align: style.align,
            bold: style.bold,
            scale: style.scale,
        });
    }

    fn text(&mut self, text: &str, style: Style) {
        for line in wrap_text(text, self.width(style)) {
            self.push(line, style);
        }
    }

    /// Left label, right-aligned value; the label wraps, the value stays on the last row
    fn columns(&mut self, left: &str, right: &str, style: Style) {
        let width = self.width(style);
        let right_width = text_width(right);

        if right_width + 1 >= width {
            self.text(left, style);
            self.text(right, style);
            return;
        }

        let left_room = width - right_width - 1;
        let mut rows = wrap_text(left, left_room);
        let last = rows.pop().unwrap_or_default();
        for row in rows {
            self.push(row, style);
        }
        self.push(
            format!("{} {}", pad_width(&last, left_room, false), right),
            style,
        );
    }

    /// Lines after the first are indented under the marker
    fn indented(&mut self, marker: &str, text: &str, style: Style) {
        let indent = text_width(marker);
        let width = self.width(style).saturating_sub(indent).max(1);
        for (i, row) in wrap_text(text, width).into_iter().enumerate() {
            let prefix = if i == 0 {
                marker.to_string()
            } else {
                " ".repeat(indent)
            };
            self.push(format!("{}{}", prefix, row), style);
        }
    }

    fn rule(&mut self, c: char) {
        self.ticket.lines.push(TicketLine::Rule(c));
    }

    fn feed(&mut self, lines: u8) {
        self.ticket.lines.push(TicketLine::Feed(lines));
    }

    fn header(&mut self, layout: &TicketLayout) {
        if let Some(text) = &layout.header_text {
            self.text(text, Style::CENTER.bold().scaled(layout.header_size));
        }
    }

    fn footer(&mut self, layout: &TicketLayout) {
        if let Some(text) = &layout.footer_text {
            self.feed(1);
            self.text(text, Style::CENTER.scaled(layout.footer_size));
        }
    }

    fn finish(self) -> Ticket {
        self.ticket
    }
}

fn format_timestamp(printed_at: &DateTime<Tz>) -> String {
    printed_at.format("%d/%m/%Y %H:%M").to_string()
}

// ========== Test page ==========

/// Diagnostic page describing the printer's own configuration
pub fn render_test_page(printer: &Printer, printed_at: &DateTime<Tz>) -> Result<Ticket, FormatError> {
    let layout = TicketLayout::from_printer(printer);
    let mut w = layout.writer(None)?;
    let columns = layout.chars_per_line as usize;

    w.text("PRUEBA DE IMPRESION", Style::CENTER.bold().scaled(2));
    w.text(&printer.name, Style::CENTER.bold());
    w.rule('=');

    let connection = match printer.connection {
        ConnectionKind::Network => "Red",
        ConnectionKind::Usb => "USB",
    };
    let pitch = match printer.char_pitch {
        CharPitch::Normal => "Normal",
        CharPitch::Condensed => "Condensada",
    };
    let mode = match printer.print_mode {
        PrintMode::StationItems => "Comandas",
        PrintMode::FullOrder => "Tickets",
        PrintMode::Both => "Comandas + Tickets",
    };
    w.columns("Conexion", connection, Style::LEFT);
    w.indented("Destino: ", &printer.system_identifier, Style::LEFT);
    w.columns("Papel", printer.paper_width.as_str(), Style::LEFT);
    w.columns("Fuente", pitch, Style::LEFT);
    w.columns("Columnas", &printer.chars_per_line.to_string(), Style::LEFT);
    w.columns("Modo", mode, Style::LEFT);
    w.columns("Copias", &printer.copies.to_string(), Style::LEFT);
    w.rule('-');

    let ruler: String = "1234567890".chars().cycle().take(columns).collect();
    w.push(ruler, Style::LEFT);
    w.text("áéíóú ÁÉÍÓÚ ñÑ ü ¿? ¡! €", Style::LEFT);
    for scale in 2..=MAX_EMPHASIS {
        w.text(&format!("x{}", scale), Style::LEFT.scaled(scale));
    }
    w.rule('-');

    w.text(&format_timestamp(printed_at), Style::CENTER);
    w.footer(&layout);
    Ok(w.finish())
}

// ========== Kitchen comanda ==========

/// Station comanda: what to prepare, never what it costs
pub fn render_comanda(
    layout: &TicketLayout,
    ticket: &KitchenTicket,
    printed_at: &DateTime<Tz>,
) -> Result<Ticket, FormatError> {
    let mut w = layout.writer(None)?;

    w.header(layout);
    let title = ticket.station_name.as_deref().unwrap_or("COMANDA");
    w.text(title, Style::CENTER.bold().scaled(2));
    if let Some(code) = &ticket.public_code {
        w.text(&format!("Pedido {}", code), Style::CENTER.bold());
    }
    if let Some(table) = &ticket.table_label {
        w.text(&format!("Mesa {}", table), Style::CENTER.bold().scaled(2));
    }
    w.text(&format_timestamp(printed_at), Style::CENTER);
    w.rule('=');

    for line in &ticket.lines {
        w.text(
            &format!("{} x{}", line.name, line.quantity),
            Style::LEFT.bold(),
        );
        if let Some(notes) = &line.notes {
            w.indented("  > ", notes, Style::LEFT);
        }
    }

    w.rule('=');
    w.footer(layout);
    Ok(w.finish())
}

// ========== Control ticket ==========

/// Amounts of a control ticket, all rounded to cents
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ControlTotals {
    pub subtotal: Decimal,
    pub discount: Decimal,
    pub total: Decimal,
    pub tax_base: Decimal,
    pub tax: Decimal,
}

fn round_money(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

fn format_money(value: Decimal) -> String {
    format!("{:.2}", round_money(value))
}

fn line_total(unit_price: Option<Decimal>, quantity: u32) -> Decimal {
    round_money(unit_price.unwrap_or_default() * Decimal::from(quantity))
}

/// Money math for a control ticket; prices include tax
pub fn compute_totals(ticket: &ControlTicket) -> ControlTotals {
    let subtotal: Decimal = ticket
        .items
        .iter()
        .map(|item| line_total(item.unit_price, item.quantity))
        .sum();

    let discount = ticket
        .discount_percentage
        .map(|pct| round_money(subtotal * pct / Decimal::ONE_HUNDRED))
        .unwrap_or_default();
    let total = subtotal - discount;

    let divisor = Decimal::ONE + ticket.tax_rate / Decimal::ONE_HUNDRED;
    let net = total.checked_div(divisor).unwrap_or(total);
    let tax = round_money(total - net);

    ControlTotals {
        subtotal,
        discount,
        total,
        tax_base: total - tax,
        tax,
    }
}

/// Full order with prices, for the cashier or the customer
pub fn render_control_ticket(
    layout: &TicketLayout,
    ticket: &ControlTicket,
    printed_at: &DateTime<Tz>,
) -> Result<Ticket, FormatError> {
    let mut w = layout.writer(layout.control_line_spacing)?;
    let body = Style::LEFT.scaled(layout.control_font_size);

    w.header(layout);
    if let Some(business) = &ticket.business {
        w.text(&business.name, Style::CENTER.bold());
        if let Some(tax_id) = &business.tax_id {
            w.text(&format!("NIF: {}", tax_id), Style::CENTER);
        }
        if let Some(address) = &business.address {
            w.text(address, Style::CENTER);
        }
        if let Some(phone) = &business.phone {
            w.text(&format!("Tel: {}", phone), Style::CENTER);
        }
    }
    w.rule('=');

    w.text("TICKET DE CONTROL", Style::CENTER.bold().scaled(layout.control_font_size));
    if let Some(code) = &ticket.order.public_code {
        w.columns("Pedido", code, body);
    }
    w.columns("Fecha", &format_timestamp(printed_at), body);
    let details = [
        ("Tipo", &ticket.order_type),
        ("Mesa", &ticket.order.table_label),
        ("Cliente", &ticket.customer_name),
        ("Atiende", &ticket.server_name),
    ];
    for (label, value) in details {
        if let Some(value) = value {
            w.columns(label, value, body);
        }
    }
    w.rule('-');

    for item in &ticket.items {
        let amount = line_total(item.unit_price, item.quantity);
        w.columns(
            &format!("{} x {}", item.quantity, item.name),
            &format_money(amount),
            body,
        );
        if let Some(price) = item.unit_price {
            w.text(&format!("    @ {}", format_money(price)), body);
        }
    }
    w.rule('-');

    let totals = compute_totals(ticket);
    w.columns("Subtotal", &format_money(totals.subtotal), body);
    if let Some(pct) = ticket.discount_percentage {
        w.columns(
            &format!("Descuento ({}%)", pct.normalize()),
            &format!("-{}", format_money(totals.discount)),
            body,
        );
    }
    w.columns("Base imponible", &format_money(totals.tax_base), body);
    w.columns(
        &format!("IVA ({}%)", ticket.tax_rate.normalize()),
        &format_money(totals.tax),
        body,
    );
    w.rule('=');
    w.columns("TOTAL", &format_money(totals.total), body.bold());

    w.footer(layout);
    Ok(w.finish())
}
