use std::collections::{HashMap, VecDeque};
use std::io;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::{json, Value};

use crate::errors::{AppError, AppResult};
use crate::maps_api::{
    FindPlaceResponse, GeocodeResponse, MapsApi, PlaceDetailsResponse, TextSearchRequest,
    TextSearchResponse,
};
use crate::resolution::Coordinates;

#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    FindPlace(String),
    Details(String),
    TextSearch {
        query: String,
        bias: Option<Coordinates>,
        category: Option<String>,
    },
    Geocode(String),
}

/// In-process Maps API with canned answers and a call log.
///
/// Unknown inputs answer `ZERO_RESULTS`.
#[derive(Default)]
pub struct FakeMapsApi {
    find_place: HashMap<String, String>,
    details: HashMap<String, Value>,
    text_search: HashMap<String, String>,
    geocode: Mutex<HashMap<String, VecDeque<Option<Value>>>>,
    transport_down: bool,
    calls: Mutex<Vec<Call>>,
}

pub fn details_ok(name: &str, address: &str, lat: f64, lng: f64) -> Value {
    json!({
        "status": "OK",
        "result": {
            "name": name,
            "formatted_address": address,
            "geometry": {"location": {"lat": lat, "lng": lng}}
        }
    })
}

pub fn geocode_ok(address: &str, lat: f64, lng: f64) -> Value {
    json!({
        "status": "OK",
        "results": [{
            "formatted_address": address,
            "geometry": {"location": {"lat": lat, "lng": lng}}
        }]
    })
}

impl FakeMapsApi {
    pub fn with_find_place(mut self, query: &str, place_id: &str) -> Self {
        self.find_place.insert(query.into(), place_id.into());
        self
    }

    pub fn with_details(self, place_id: &str, payload: Value) -> Self {
        self.with_details_payload(place_id, payload)
    }

    pub fn with_details_payload(mut self, place_id: &str, payload: Value) -> Self {
        self.details.insert(place_id.into(), payload);
        self
    }

    pub fn with_text_search(mut self, query: &str, place_id: &str) -> Self {
        self.text_search.insert(query.into(), place_id.into());
        self
    }

    pub fn with_geocode(self, address: &str, formatted: &str, lat: f64, lng: f64) -> Self {
        self.with_geocode_sequence(address, vec![Some(geocode_ok(formatted, lat, lng))])
    }

    /// Answers in order; `None` simulates a transport failure. The last entry repeats.
    pub fn with_geocode_sequence(self, address: &str, answers: Vec<Option<Value>>) -> Self {
        self.geocode
            .lock()
            .insert(address.into(), answers.into_iter().collect());
        self
    }

    pub fn failing_transport(mut self) -> Self {
        self.transport_down = true;
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().clone()
    }

    pub fn count(&self, matches: impl Fn(&Call) -> bool) -> usize {
        self.calls.lock().iter().filter(|call| matches(call)).count()
    }

    pub fn text_search_calls(&self) -> usize {
        self.count(|call| matches!(call, Call::TextSearch { .. }))
    }

    pub fn geocode_calls(&self, address: &str) -> usize {
        self.count(|call| matches!(call, Call::Geocode(a) if a == address))
    }

    fn record(&self, call: Call) -> AppResult<()> {
        self.calls.lock().push(call);
        if self.transport_down {
            return Err(timeout());
        }
        Ok(())
    }
}

fn timeout() -> AppError {
    AppError::Io(io::Error::new(io::ErrorKind::TimedOut, "operation timed out"))
}

fn zero_results() -> Value {
    json!({"status": "ZERO_RESULTS"})
}

#[async_trait]
impl MapsApi for FakeMapsApi {
    async fn find_place(&self, input: &str) -> AppResult<FindPlaceResponse> {
        self.record(Call::FindPlace(input.into()))?;
        let body = match self.find_place.get(input) {
            Some(place_id) => json!({"status": "OK", "candidates": [{"place_id": place_id}]}),
            None => zero_results(),
        };
        Ok(serde_json::from_value(body)?)
    }

    async fn place_details(&self, place_id: &str) -> AppResult<PlaceDetailsResponse> {
        self.record(Call::Details(place_id.into()))?;
        let body = self
            .details
            .get(place_id)
            .cloned()
            .unwrap_or_else(|| json!({"status": "NOT_FOUND"}));
        Ok(serde_json::from_value(body)?)
    }

    async fn text_search(&self, request: &TextSearchRequest<'_>) -> AppResult<TextSearchResponse> {
        self.record(Call::TextSearch {
            query: request.query.into(),
            bias: request.bias,
            category: request.category.map(str::to_string),
        })?;
        let body = match self.text_search.get(request.query) {
            Some(place_id) => json!({"status": "OK", "results": [{"place_id": place_id}]}),
            None => zero_results(),
        };
        Ok(serde_json::from_value(body)?)
    }

    async fn geocode(&self, address: &str) -> AppResult<GeocodeResponse> {
        self.record(Call::Geocode(address.into()))?;
        let answer = {
            let mut geocode = self.geocode.lock();
            match geocode.get_mut(address) {
                Some(queue) if queue.len() > 1 => queue.pop_front().flatten(),
                Some(queue) => match queue.front() {
                    Some(answer) => answer.clone(),
                    None => Some(zero_results()),
                },
                None => Some(zero_results()),
            }
        };
        let body = answer.ok_or_else(timeout)?;
        Ok(serde_json::from_value(body)?)
    }
}
