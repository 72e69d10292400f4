// examples/split_fanout.rs
//
// A split region: three concurrent worker branches feeding shared task data,
// joined back into the parent chain, which reports the combined result.

use catena::{ChainControl, ChainFactory, ThreadHost};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

fn main() -> anyhow::Result<()> {
  tracing_subscriber::fmt()
    .with_max_level(tracing::Level::INFO)
    .init();

  let host = Arc::new(ThreadHost::new());
  let factory = ChainFactory::new(host.clone());

  let (finished_tx, finished_rx) = crossbeam_channel::bounded::<bool>(1);

  let chain = factory.create()?.on_error(|err, holder| {
    eprintln!("step {} failed: {err}", holder.index());
  })?;
  let data = chain.task_data();

  let mut split = chain.split()?;
  for (name, cost_ms) in [("alpha", 40u64), ("beta", 10), ("gamma", 25)] {
    let data = data.clone();
    split = split.on_worker(move || {
      thread::sleep(Duration::from_millis(cost_ms));
      data.set(name, cost_ms);
      Ok(())
    })?;
  }

  split
    .collect()?
    .on_main(move |_: ()| {
      let total: u64 = ["alpha", "beta", "gamma"]
        .iter()
        .filter_map(|key| data.get::<u64>(key))
        .sum();
      println!("all branches joined; total simulated cost: {total}ms");
      Ok(ChainControl::Continue(()))
    })?
    .on_done(move |ok| {
      let _ = finished_tx.send(ok);
    })?
    .execute()?;

  finished_rx.recv()?;
  factory.shutdown(Duration::from_secs(5));
  host.stop();
  Ok(())
}
