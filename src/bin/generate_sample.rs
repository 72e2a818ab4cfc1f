use std::sync::Arc;

use anyhow::{Context, Result};
use arrow::array::{Float64Array, Int64Array, StringArray};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use parquet::arrow::ArrowWriter;

use rusty_events::{Dataset, Value};

/// Minimal deterministic PRNG (xoshiro256**)
struct SimpleRng {
    state: [u64; 4],
}

impl SimpleRng {
    fn new(seed: u64) -> Self {
        let mut s = [0u64; 4];
        let mut x = seed;
        for slot in &mut s {
            x = x.wrapping_mul(6364136223846793005).wrapping_add(1);
            *slot = x;
        }
        SimpleRng { state: s }
    }

    fn next_u64(&mut self) -> u64 {
        let result = (self.state[1].wrapping_mul(5))
            .rotate_left(7)
            .wrapping_mul(9);
        let t = self.state[1] << 17;
        self.state[2] ^= self.state[0];
        self.state[3] ^= self.state[1];
        self.state[1] ^= self.state[2];
        self.state[0] ^= self.state[3];
        self.state[2] ^= t;
        self.state[3] = self.state[3].rotate_left(45);
        result
    }

    fn next_f64(&mut self) -> f64 {
        (self.next_u64() >> 11) as f64 / (1u64 << 53) as f64
    }

    fn pick<'a>(&mut self, items: &[&'a str]) -> &'a str {
        items[(self.next_u64() % items.len() as u64) as usize]
    }

    /// Box-Muller transform for normal distribution
    fn gauss(&mut self, mean: f64, std_dev: f64) -> f64 {
        let u1 = self.next_f64().max(1e-15);
        let u2 = self.next_f64();
        let z = (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos();
        mean + std_dev * z
    }
}

fn main() -> Result<()> {
    env_logger::init();
    let mut rng = SimpleRng::new(42);

    // Time axis: 0.0 → 9.9, step 0.1
    let times: Vec<f64> = (0..100).map(|i| i as f64 / 10.0).collect();
    let channels = ["a", "b", "c"];
    let labels = ["spike", "burst", "noise"];

    let signal: Vec<f64> = times
        .iter()
        .flat_map(|_| channels.iter())
        .map(|_| rng.gauss(0.0, 1.0))
        .collect();

    let dataset = Dataset::new()
        .with_coord("time", times.iter().copied().map(Value::from).collect())?
        .with_coord("channel", channels.iter().copied().map(Value::from).collect())?
        .with_variable("signal", &["time", "channel"], signal)?;
    std::fs::write("sample_dataset.json", dataset.to_json_string()?)
        .context("writing sample_dataset.json")?;

    // Events scattered over the time axis
    let n_events = 60;
    let mut ids: Vec<i64> = Vec::with_capacity(n_events);
    let mut event_times: Vec<f64> = Vec::with_capacity(n_events);
    let mut event_channels: Vec<&str> = Vec::with_capacity(n_events);
    let mut event_labels: Vec<&str> = Vec::with_capacity(n_events);
    let mut amplitudes: Vec<f64> = Vec::with_capacity(n_events);

    for id in 0..n_events {
        ids.push(id as i64);
        event_times.push((rng.next_f64() * 99.0).round() / 10.0);
        event_channels.push(rng.pick(&channels));
        event_labels.push(rng.pick(&labels));
        amplitudes.push(rng.gauss(1.0, 0.3).abs());
    }

    let schema = Arc::new(Schema::new(vec![
        Field::new("event_id", DataType::Int64, false),
        Field::new("time", DataType::Float64, false),
        Field::new("channel", DataType::Utf8, false),
        Field::new("label", DataType::Utf8, false),
        Field::new("amplitude", DataType::Float64, false),
    ]));

    let batch = RecordBatch::try_new(
        schema.clone(),
        vec![
            Arc::new(Int64Array::from(ids.clone())),
            Arc::new(Float64Array::from(event_times.clone())),
            Arc::new(StringArray::from(event_channels.clone())),
            Arc::new(StringArray::from(event_labels.clone())),
            Arc::new(Float64Array::from(amplitudes.clone())),
        ],
    )
    .context("building record batch")?;

    // Write Parquet
    let file = std::fs::File::create("sample_events.parquet")
        .context("creating sample_events.parquet")?;
    let mut writer = ArrowWriter::try_new(file, schema, None).context("creating parquet writer")?;
    writer.write(&batch).context("writing parquet batch")?;
    writer.close().context("closing parquet writer")?;

    // Write CSV
    let mut csv_writer =
        csv::Writer::from_path("sample_events.csv").context("creating sample_events.csv")?;
    csv_writer.write_record(["event_id", "time", "channel", "label", "amplitude"])?;
    for i in 0..n_events {
        csv_writer.write_record([
            ids[i].to_string(),
            event_times[i].to_string(),
            event_channels[i].to_string(),
            event_labels[i].to_string(),
            format!("{:.4}", amplitudes[i]),
        ])?;
    }
    csv_writer.flush()?;

    println!(
        "Wrote sample_dataset.json ({} times x {} channels) and {n_events} events to sample_events.{{csv,parquet}}",
        times.len(),
        channels.len()
    );
    Ok(())
}
