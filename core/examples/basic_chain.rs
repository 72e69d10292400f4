// examples/basic_chain.rs
//
// A minimal chain: produce a value on the main context, transform it on the
// worker pool, report it back on the main context.

use catena::{ChainControl, ChainFactory, ThreadHost};
use std::sync::Arc;
use std::time::Duration;

fn main() -> anyhow::Result<()> {
  tracing_subscriber::fmt()
    .with_max_level(tracing::Level::INFO)
    .init();

  let host = Arc::new(ThreadHost::new());
  let factory = ChainFactory::new(host.clone());

  let (finished_tx, finished_rx) = crossbeam_channel::bounded::<bool>(1);

  factory
    .create()?
    .on_main(|_: ()| Ok(ChainControl::Continue(21i64)))?
    .on_worker(|n: i64| Ok(ChainControl::Continue(n * 2)))?
    .on_main(|n: i64| {
      println!("the answer is {n}");
      Ok(ChainControl::Continue(()))
    })?
    .on_done(move |ok| {
      let _ = finished_tx.send(ok);
    })?
    .execute()?;

  let clean = finished_rx.recv()?;
  println!("chain finished cleanly: {clean}");

  factory.shutdown(Duration::from_secs(5));
  host.stop();
  Ok(())
}
