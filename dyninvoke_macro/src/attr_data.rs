use proc_macro2::Span;
use syn::punctuated::Punctuated;
use syn::{spanned::Spanned, *};

pub struct AttrData {
	pub library: syn::Path,
	pub link_name: Option<(String, Span)>,
}

impl TryFrom<Punctuated<Expr, Token!(,)>> for AttrData {
	type Error = syn::Error;
	fn try_from(value: Punctuated<Expr, Token!(,)>) -> Result<Self> {
		let mut library: Option<syn::Path> = None;
		let mut link_name: Option<(String, Span)> = None;
		let mut errors = vec![];
		const EXPECTED_KW: &str = "expected `library` or `link_name`";

		for expr in value.iter() {
			let Expr::Assign(assign) = expr else {
				errors.push(Error::new(expr.span(), EXPECTED_KW));
				continue;
			};
			let (left, right) = (assign.left.as_ref(), assign.right.as_ref());
			let Expr::Path(ExprPath { path: key, .. }) = left else {
				errors.push(Error::new(left.span(), EXPECTED_KW));
				continue;
			};
			if key.is_ident("library") {
				// #[bind(library = <path>)]
				match right {
					Expr::Path(ExprPath { path, .. }) if library.is_none() => {
						library = Some(path.clone());
					}
					Expr::Path(_) => errors.push(Error::new(assign.span(), "library is already defined")),
					right => errors.push(Error::new(right.span(), "expected a path to a `Binding`")),
				}
			} else if key.is_ident("link_name") {
				// #[bind(link_name = <string>)]
				match right {
					Expr::Lit(ExprLit {
						lit: Lit::Str(val), ..
					}) if link_name.is_none() => {
						link_name = Some((val.value(), assign.span()));
					}
					Expr::Lit(_) => errors.push(Error::new(assign.span(), "link_name is already defined")),
					right => errors.push(Error::new(right.span(), "expected a string literal")),
				}
			} else {
				errors.push(Error::new(left.span(), EXPECTED_KW));
			}
		}

		let library = match library {
			Some(library) if errors.is_empty() => library,
			maybe_library => {
				if maybe_library.is_none() {
					errors.push(Error::new(
						value.span(),
						"no library given, suggest using: `library = <path>`",
					));
				}
				let mut errors = errors.into_iter();
				let mut main_err = errors
					.next()
					.unwrap_or_else(|| Error::new(value.span(), EXPECTED_KW));
				for err in errors {
					main_err.combine(err);
				}
				return Err(main_err);
			}
		};
		Ok(Self { library, link_name })
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use quote::quote;
	use syn::parse::Parser;

	fn parse(tokens: proc_macro2::TokenStream) -> Result<AttrData> {
		let punct = Punctuated::<Expr, Token!(,)>::parse_terminated.parse2(tokens)?;
		AttrData::try_from(punct)
	}

	#[test]
	fn library_and_link_name() {
		let attr = parse(quote!(library = crate::LIBC, link_name = "atoi")).unwrap();
		assert_eq!(attr.library.segments.len(), 2);
		assert_eq!(attr.link_name.map(|(name, _)| name).as_deref(), Some("atoi"));
	}

	#[test]
	fn library_is_required() {
		assert!(parse(quote!()).is_err());
		assert!(parse(quote!(link_name = "atoi")).is_err());
	}

	#[test]
	fn rejects_duplicates_and_unknown_keys() {
		assert!(parse(quote!(library = A, library = B)).is_err());
		assert!(parse(quote!(library = A, strip = true)).is_err());
		assert!(parse(quote!(library = "a.so")).is_err());
	}
}
