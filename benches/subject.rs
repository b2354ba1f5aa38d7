use bencher::{benchmark_group, benchmark_main, black_box, Bencher};
use rxpush::prelude::*;

fn subject_broadcast(b: &mut Bencher) {
  let subject = Subject::<u64>::new();
  let subs: Vec<_> = (0..16)
    .map(|_| subject.subscribe_next(|v| { black_box(v); }).unwrap())
    .collect();
  b.iter(|| {
    for v in 0..100 {
      subject.on_next(v).unwrap();
    }
  });
  subs.iter().for_each(Disposable::dispose);
}

fn subscribe_dispose_churn(b: &mut Bencher) {
  let subject = Subject::<u64>::new();
  b.iter(|| {
    let subs: Vec<_> = (0..64).map(|_| subject.subscribe_nop().unwrap()).collect();
    subs.iter().rev().for_each(Disposable::dispose);
  });
}

fn operator_chain(b: &mut Bencher) {
  b.iter(|| {
    observable::from_iter(0..1000u64)
      .filter(|v| v % 3 == 0)
      .map(|v| v * 2)
      .skip(10)
      .take(200)
      .subscribe_next(|v| { black_box(v); })
      .unwrap()
  });
}

benchmark_group!(benches, subject_broadcast, subscribe_dispose_churn, operator_chain);
benchmark_main!(benches);
