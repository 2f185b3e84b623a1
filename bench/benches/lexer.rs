use brisk::{lexer, token::TokenKind};
use criterion::{criterion_group, criterion_main, Criterion};
use std::hint::black_box;

static INPUTS: [(&str, &str); 3] = [
    ("arith", include_str!("../../samples/arith.bk")),
    ("loops", include_str!("../../samples/loops.bk")),
    ("params", include_str!("../../samples/params.bk")),
];

fn lex(input: &str, tokens: &mut Vec<brisk::token::Token>) {
    tokens.clear();
    lexer::lex(input, tokens);
    let errors = tokens.iter().filter(|t| t.kind.is_error()).count();
    debug_assert_eq!(tokens.last().map(|t| t.kind), Some(TokenKind::Eof));
    black_box(errors);
}

fn criterion_benchmark(c: &mut Criterion) {
    let mut tokens = Vec::with_capacity(lexer::SUGGESTED_TOKENS_CAPACITY);

    for (name, input) in INPUTS {
        c.bench_function(&format!("lexer/{name}"), |b| {
            b.iter(|| lex(black_box(input), &mut tokens));
        });
    }
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
