use crate::models::{FilterSpec, FlightOffer, TripType};

/// Telegram rejects messages longer than this.
pub const MAX_MESSAGE_CHARS: usize = 4096;

const OFFER_SEPARATOR: &str = "\n---\n\n";

/// Order offers by earliest segment date. Undated offers go last; ties keep extraction order.
pub fn sort_offers(offers: &mut [FlightOffer]) {
    offers.sort_by_key(FlightOffer::sort_key);
}

fn trip_icon(trip: &TripType) -> &'static str {
    match trip {
        TripType::OneWay => "➡️",
        TripType::Return { .. } => "🔁",
    }
}

pub fn render_header(spec: &FilterSpec, offer_count: usize) -> String {
    format!(
        "<b>🔎 {}</b>\n{} offers from {}\n\n",
        escape_html(&spec.name),
        offer_count,
        escape_html(&spec.origin)
    )
}

pub fn render_offer(spec: &FilterSpec, offer: &FlightOffer) -> String {
    let mut block = format!(
        "{} 💰 Price: <b>{} {}</b>\n",
        trip_icon(&spec.trip),
        offer.price.normalize(),
        spec.currency
    );
    if let Some(days) = offer.trip_duration_days {
        block.push_str(&format!("🗓 {} days\n", days));
    }
    for segment in &offer.segments {
        block.push_str(&format!(
            "📅 <b>{}</b> 🕒 {} ✈️ {}\n",
            escape_html(&segment.date),
            escape_html(&segment.time),
            escape_html(&segment.route)
        ));
    }
    block
}

/// Sort and render the surviving offers for one filter.
///
/// Returns no message when nothing survived. The header always travels with
/// the first offer. The summary is split on offer boundaries when it would
/// exceed [`MAX_MESSAGE_CHARS`]; a single offer that is too long on its own is
/// split on line boundaries.
pub fn render_messages(spec: &FilterSpec, mut offers: Vec<FlightOffer>) -> Vec<String> {
    if offers.is_empty() {
        return Vec::new();
    }
    sort_offers(&mut offers);

    let mut messages = Vec::new();
    let mut current = String::new();

    for (index, offer) in offers.iter().enumerate() {
        let mut block = render_offer(spec, offer);
        if index == 0 {
            block.insert_str(0, &render_header(spec, offers.len()));
        }
        block.push_str(OFFER_SEPARATOR);

        let block_len = block.chars().count();
        if !current.is_empty() && current.chars().count() + block_len > MAX_MESSAGE_CHARS {
            push_message(&mut messages, &current);
            current.clear();
        }

        if block_len > MAX_MESSAGE_CHARS {
            let mut pieces = split_oversized(&block);
            // The tail stays open so the next offers can share its message.
            current = pieces.pop().unwrap_or_default();
            for piece in &pieces {
                push_message(&mut messages, piece);
            }
        } else {
            current.push_str(&block);
        }
    }
    push_message(&mut messages, &current);
    messages
}

fn push_message(messages: &mut Vec<String>, text: &str) {
    let text = text.trim_end();
    if !text.trim().is_empty() {
        messages.push(text.to_string());
    }
}

/// Pack the lines of `text` into pieces of at most [`MAX_MESSAGE_CHARS`].
fn split_oversized(text: &str) -> Vec<String> {
    let mut pieces = Vec::new();
    let mut current = String::new();
    let mut current_len = 0;

    for line in text.split_inclusive('\n') {
        for chunk in char_chunks(line, MAX_MESSAGE_CHARS) {
            let len = chunk.chars().count();
            if current_len > 0 && current_len + len > MAX_MESSAGE_CHARS {
                pieces.push(std::mem::take(&mut current));
                current_len = 0;
            }
            current.push_str(chunk);
            current_len += len;
        }
    }
    if !current.is_empty() {
        pieces.push(current);
    }
    pieces
}

/// Cut `line` into slices of at most `max` chars, on char boundaries.
fn char_chunks(line: &str, max: usize) -> Vec<&str> {
    let mut chunks = Vec::new();
    let mut rest = line;
    while !rest.is_empty() {
        let end = rest.char_indices().nth(max).map_or(rest.len(), |(i, _)| i);
        let (head, tail) = rest.split_at(end);
        chunks.push(head);
        rest = tail;
    }
    chunks
}

pub fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;").replace('<', "&lt;").replace('>', "&gt;")
}
